//! Host configuration.
//!
//! [`HostConfig`] is plain data fixed for the host's lifetime. Build it with
//! [`ConfigBuilder`], or deserialize it from a JSON object (camelCase keys)
//! when an embedding CLI loads options from a file.

use std::ffi::OsStr;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::artifact::RuntimeAdapter;
use crate::preprocess::Preprocess;

// =============================================================================
// TargetVersion
// =============================================================================

/// Language version the engine parses and emits for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetVersion {
    /// ECMAScript 3.
    Es3,
    /// ECMAScript 5.
    #[default]
    Es5,
    /// ECMAScript 2015.
    #[serde(alias = "es6")]
    Es2015,
    /// ECMAScript 2016.
    Es2016,
    /// ECMAScript 2017.
    Es2017,
    /// ECMAScript 2018.
    Es2018,
    /// ECMAScript 2019.
    Es2019,
    /// ECMAScript 2020.
    Es2020,
    /// ECMAScript 2021.
    Es2021,
    /// ECMAScript 2022.
    Es2022,
    /// Latest supported version.
    EsNext,
}

impl TargetVersion {
    /// Conventional lowercase name (`"es5"`, `"esnext"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Es3 => "es3",
            Self::Es5 => "es5",
            Self::Es2015 => "es2015",
            Self::Es2016 => "es2016",
            Self::Es2017 => "es2017",
            Self::Es2018 => "es2018",
            Self::Es2019 => "es2019",
            Self::Es2020 => "es2020",
            Self::Es2021 => "es2021",
            Self::Es2022 => "es2022",
            Self::EsNext => "esnext",
        }
    }
}

// =============================================================================
// HostConfig
// =============================================================================

/// Options fixed at host construction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HostConfig {
    /// Working directory relative names resolve against.
    pub current_dir: PathBuf,
    /// Root of the output tree.
    pub out_dir: PathBuf,
    /// Root of the source tree.
    pub root_dir: PathBuf,
    /// Language version handed to the parser.
    pub target: TargetVersion,
    /// Directive preprocessing for sources and markup.
    pub preprocess: Preprocess,
    /// Overrides merged over the default markup minify options.
    pub html_minify: Map<String, Value>,
    /// Minify inlined stylesheets.
    pub minify_css: bool,
    /// Output names matching any of these globs get no hot-reload bootstrap.
    #[serde(alias = "excludeHmrFiles")]
    pub hmr_exclude: Vec<String>,
    /// Inject hot-reload bootstrap code on artifact reads.
    pub hmr: bool,
    /// Skip the case-sensitivity probe and use this value.
    pub case_sensitive: Option<bool>,
    /// Hot-reload runtime helpers and their capabilities.
    pub runtime: RuntimeAdapter,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            current_dir: PathBuf::from("."),
            out_dir: PathBuf::from("."),
            root_dir: PathBuf::from("."),
            target: TargetVersion::default(),
            preprocess: Preprocess::Disabled,
            html_minify: Map::new(),
            minify_css: false,
            hmr_exclude: Vec::new(),
            hmr: !is_production(),
            case_sensitive: None,
            runtime: RuntimeAdapter::default(),
        }
    }
}

/// Whether `NODE_ENV` says this is a production run.
pub fn is_production() -> bool {
    production_mode(std::env::var_os("NODE_ENV").as_deref())
}

fn production_mode(node_env: Option<&OsStr>) -> bool {
    node_env.is_some_and(|env| env == OsStr::new("production"))
}

// =============================================================================
// ConfigBuilder
// =============================================================================

/// Configuration builder for fluent API.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: HostConfig,
}

impl ConfigBuilder {
    /// Start from the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the working directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.current_dir = dir.into();
        self
    }

    /// Set the output root.
    pub fn out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.out_dir = dir.into();
        self
    }

    /// Set the source root.
    pub fn root_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.root_dir = dir.into();
        self
    }

    /// Set the target language version.
    pub fn target(mut self, target: TargetVersion) -> Self {
        self.config.target = target;
        self
    }

    /// Configure directive preprocessing.
    pub fn preprocess(mut self, preprocess: Preprocess) -> Self {
        self.config.preprocess = preprocess;
        self
    }

    /// Override markup minify options, e.g. `{"collapseWhitespace": false}`.
    pub fn html_minify(mut self, overrides: Map<String, Value>) -> Self {
        self.config.html_minify = overrides;
        self
    }

    /// Enable or disable stylesheet minification.
    pub fn minify_css(mut self, minify: bool) -> Self {
        self.config.minify_css = minify;
        self
    }

    /// Exclude output names from hot-reload injection.
    pub fn hmr_exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.hmr_exclude = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable hot-reload injection.
    ///
    /// Default: enabled unless `NODE_ENV=production`.
    pub fn hmr(mut self, enabled: bool) -> Self {
        self.config.hmr = enabled;
        self
    }

    /// Force case sensitivity instead of probing the file system.
    pub fn case_sensitive(mut self, sensitive: bool) -> Self {
        self.config.case_sensitive = Some(sensitive);
        self
    }

    /// Declare the hot-reload runtime adapter.
    pub fn runtime(mut self, runtime: RuntimeAdapter) -> Self {
        self.config.runtime = runtime;
        self
    }

    /// Finish building.
    pub fn build(self) -> HostConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let config = ConfigBuilder::new()
            .current_dir("/work")
            .out_dir("dist")
            .root_dir("src")
            .target(TargetVersion::Es2015)
            .minify_css(true)
            .hmr(false)
            .hmr_exclude(["*.spec.js"])
            .build();
        assert_eq!(config.out_dir, PathBuf::from("dist"));
        assert_eq!(config.target, TargetVersion::Es2015);
        assert!(config.minify_css);
        assert!(!config.hmr);
        assert_eq!(config.hmr_exclude, vec!["*.spec.js".to_string()]);
    }

    #[test]
    fn test_deserialize_camel_case() {
        let config: HostConfig = serde_json::from_value(json!({
            "outDir": "dist",
            "rootDir": "src",
            "target": "es6",
            "preprocess": { "NODE_ENV": "production" },
            "htmlMinify": { "removeComments": false },
            "minifyCss": true,
            "excludeHmrFiles": ["vendor/**"],
            "hmr": false,
            "runtime": { "capabilities": { "rerender": false } }
        }))
        .unwrap();
        assert_eq!(config.root_dir, PathBuf::from("src"));
        assert_eq!(config.target, TargetVersion::Es2015);
        assert!(matches!(config.preprocess, Preprocess::Definitions(_)));
        assert_eq!(config.html_minify.get("removeComments"), Some(&json!(false)));
        assert_eq!(config.hmr_exclude, vec!["vendor/**".to_string()]);
        assert!(!config.runtime.capabilities.rerender);
        assert!(config.runtime.capabilities.reload);
        assert_eq!(config.runtime.framework, "vue");
    }

    #[test]
    fn test_production_mode() {
        assert!(production_mode(Some(OsStr::new("production"))));
        assert!(!production_mode(Some(OsStr::new("development"))));
        assert!(!production_mode(Some(OsStr::new("Production"))));
        assert!(!production_mode(None));
    }

    #[test]
    fn test_target_names() {
        assert_eq!(TargetVersion::EsNext.as_str(), "esnext");
        assert_eq!(TargetVersion::default().as_str(), "es5");
    }
}
