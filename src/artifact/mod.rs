//! Post-processing of emitted artifacts.
//!
//! ```text
//! engine write ──► rewrite_references ──► OutputStore
//!                  (templateUrl/styleUrl → require)
//!
//! consumer read ◄── inject_hot_reload ◄── OutputStore
//!                   (bootstrap before the source-map marker)
//!
//! bundler transform ──► inline_resource(c.html | c.css)
//! ```

mod hmr;
mod minify;
mod resource;
mod rewrite;
mod tracker;

use std::path::Path;

pub use hmr::{
    component_id, helper_location, splice, ExcludeMatcher, HmrInjector, HmrStrategy, HmrTemplate,
    RuntimeAdapter, RuntimeCapabilities, SOURCE_MAP_MARKER,
};
pub use minify::{BasicMinifier, HtmlMinifyOptions, MarkupMinifier, MarkupValidator, NoValidation};
pub use resource::{inline_markup, inline_stylesheet, minify_stylesheet, MarkupPipeline};
pub use rewrite::{rewrite_all, rewrite_references, ResourceKind};
pub use tracker::RenderTracker;

use crate::config::HostConfig;
use crate::diagnostic::HostError;
use crate::path::CanonicalPath;
use crate::preprocess::{Preprocessor, SourceKind};

/// Rewrites, inlines and hot-reload-instruments emitted text.
pub struct ArtifactPostProcessor {
    preprocessor: Option<Preprocessor>,
    minifier: Box<dyn MarkupMinifier>,
    validator: Box<dyn MarkupValidator>,
    html_options: HtmlMinifyOptions,
    minify_css: bool,
    hmr: Option<HmrInjector>,
    tracker: RenderTracker,
}

impl ArtifactPostProcessor {
    /// Build from host configuration with the given markup collaborators.
    ///
    /// Hot-reload helpers are resolved against `current_dir`.
    pub fn new(
        config: &HostConfig,
        current_dir: &Path,
        minifier: Box<dyn MarkupMinifier>,
        validator: Box<dyn MarkupValidator>,
    ) -> Result<Self, HostError> {
        let hmr = if config.hmr {
            Some(HmrInjector::new(&config.runtime, current_dir, &config.hmr_exclude)?)
        } else {
            None
        };

        Ok(Self {
            preprocessor: Preprocessor::from_config(&config.preprocess),
            minifier,
            validator,
            html_options: HtmlMinifyOptions::with_overrides(&config.html_minify)?,
            minify_css: config.minify_css,
            hmr,
            tracker: RenderTracker::new(),
        })
    }

    /// The effective markup minify options.
    pub fn html_options(&self) -> &HtmlMinifyOptions {
        &self.html_options
    }

    /// Whether hot-reload injection is active.
    pub fn hmr_enabled(&self) -> bool {
        self.hmr.is_some()
    }

    // =========================================================================
    // Preprocessing
    // =========================================================================

    /// Apply directive preprocessing, or return `text` unchanged when disabled.
    pub fn preprocess(&self, text: &str, kind: SourceKind) -> String {
        match &self.preprocessor {
            Some(pp) => pp.process(text, kind),
            None => text.to_string(),
        }
    }

    // =========================================================================
    // Resource Inlining
    // =========================================================================

    /// Minified markup of a template file; empty if the file is missing.
    pub fn inline_markup(&self, path: &Path) -> String {
        let pipeline = MarkupPipeline {
            preprocessor: self.preprocessor.as_ref(),
            validator: self.validator.as_ref(),
            minifier: self.minifier.as_ref(),
            options: &self.html_options,
        };
        inline_markup(path, &pipeline)
    }

    /// Stylesheet text, minified if configured; empty if the file is missing.
    pub fn inline_stylesheet(&self, path: &Path) -> String {
        inline_stylesheet(path, self.minify_css)
    }

    // =========================================================================
    // Reference Rewrite
    // =========================================================================

    /// Rewrite `templateUrl` and `styleUrl` properties, resolving against
    /// the directory of the artifact's source file.
    pub fn rewrite_references(&self, text: &str, source_dir: &Path) -> String {
        rewrite_all(text, source_dir)
    }

    // =========================================================================
    // Hot Reload
    // =========================================================================

    /// Splice the hot-reload bootstrap into `text` when enabled, the output
    /// is not a declaration file, and `logical_name` is not excluded.
    ///
    /// The component identity comes from the canonical `source` path.
    pub fn inject_hot_reload(
        &self,
        text: String,
        output: &CanonicalPath,
        logical_name: &str,
        source: &CanonicalPath,
    ) -> String {
        let Some(hmr) = &self.hmr else {
            return text;
        };
        if !hmr.applies_to(output, logical_name) {
            tracing::trace!(path = %output, "Hot reload skipped");
            return text;
        }

        hmr.inject(&text, &component_id(source))
    }

    /// Whether `render` differs from the render last recorded for component
    /// `id`. Artifact reads never touch these records.
    pub fn render_changed(&mut self, id: &str, render: &str) -> bool {
        self.tracker.render_changed(id, render)
    }
}

impl std::fmt::Debug for ArtifactPostProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactPostProcessor")
            .field("html_options", &self.html_options)
            .field("minify_css", &self.minify_css)
            .field("hmr", &self.hmr.is_some())
            .field("tracked", &self.tracker.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use std::fs;
    use tempfile::TempDir;

    fn processor(config: &HostConfig) -> ArtifactPostProcessor {
        ArtifactPostProcessor::new(config, Path::new("/nonexistent"), Box::new(BasicMinifier), Box::new(NoValidation))
            .unwrap()
    }

    #[test]
    fn test_hmr_disabled_returns_text() {
        let post = processor(&ConfigBuilder::new().hmr(false).build());
        let out = CanonicalPath::from_test("/w/dist/c.js");
        let text = "exports.c = 1;\n".to_string();
        assert_eq!(post.inject_hot_reload(text.clone(), &out, "c.js", &out), text);
        assert!(!post.hmr_enabled());
    }

    #[test]
    fn test_hmr_injects_before_marker() {
        let post = processor(&ConfigBuilder::new().hmr(true).build());
        let out = CanonicalPath::from_test("/w/dist/c.js");
        let src = CanonicalPath::from_test("/w/src/c.js");
        let text = "exports.c = 1;\n//# sourceMappingURL=c.js.map".to_string();
        let injected = post.inject_hot_reload(text, &out, "src/c.js", &src);
        assert!(injected.contains(&component_id(&src)));
        assert!(injected.ends_with("\n//# sourceMappingURL=c.js.map"));
        assert!(injected.starts_with("exports.c = 1;\nif (module.hot) {"));
    }

    #[test]
    fn test_injection_leaves_render_records_alone() {
        let mut post = processor(&ConfigBuilder::new().hmr(true).build());
        let out = CanonicalPath::from_test("/w/dist/c.js");
        let id = component_id(&out);
        assert!(post.render_changed(&id, "function render() {}"));
        assert!(!post.render_changed(&id, "function render() {}"));

        post.inject_hot_reload("exports.c = 1;".to_string(), &out, "c.js", &out);
        assert!(!post.render_changed(&id, "function render() {}"));
        assert!(post.render_changed(&id, "function render() { return 1; }"));
    }

    #[test]
    fn test_invalid_overrides_fail_construction() {
        let mut overrides = serde_json::Map::new();
        overrides.insert("collapseWhitespace".to_string(), serde_json::json!("no"));
        let config = ConfigBuilder::new().html_minify(overrides).build();
        let result = ArtifactPostProcessor::new(&config, Path::new("."), Box::new(BasicMinifier), Box::new(NoValidation));
        assert!(matches!(result, Err(HostError::MinifyOptions(_))));
    }

    #[test]
    fn test_inline_with_config() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("c.css"), "a { color: red; }").unwrap();
        let post = processor(&ConfigBuilder::new().minify_css(true).build());
        assert_eq!(post.inline_stylesheet(&dir.path().join("c.css")), "a{color:red;}");
        assert_eq!(post.inline_markup(&dir.path().join("c.html")), "");
    }
}
