//! Hot-reload bootstrap injection.
//!
//! The bootstrap is rendered once per host from a fixed template: the
//! runtime adapter's declared capabilities pick the template and the
//! record-update strategy up front, and helper module references are
//! resolved before any text is spliced. Only the component identity is
//! filled in per artifact.
//!
//! ```text
//! emitted text ──► contains "//# sourceMappingURL"?
//!                    ├─ yes: <text before marker> + bootstrap + <marker ...>
//!                    └─ no:  <trimmed text> + "\n" + bootstrap
//! ```

use std::path::Path;

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use xxhash_rust::xxh3::xxh3_64;

use crate::diagnostic::HostError;
use crate::path::{normalize_slashes, CanonicalPath};

/// Marker that starts the trailing source-map reference of emitted JS.
pub const SOURCE_MAP_MARKER: &str = "//# sourceMappingURL";

// =============================================================================
// Runtime Adapter
// =============================================================================

/// What the hot-reload runtime library can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuntimeCapabilities {
    /// The API exposes `rerender`.
    pub rerender: bool,
    /// The API exposes `reload`.
    pub reload: bool,
    /// Plain function/object modules can be wrapped by the update module.
    pub wraps_plain_modules: bool,
}

impl Default for RuntimeCapabilities {
    fn default() -> Self {
        Self {
            rerender: true,
            reload: true,
            wraps_plain_modules: true,
        }
    }
}

/// Declares the runtime helpers the bootstrap code talks to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuntimeAdapter {
    /// Module name of the component framework.
    pub framework: String,
    /// Name of the framework's component base constructor.
    pub component_base: String,
    /// Module name of the hot-reload API.
    pub hot_reload_api: String,
    /// Module name of the update helper for non-component modules.
    pub update_module: String,
    /// Directory helpers live under when not installed at top level.
    pub helper_fallback_dir: String,
    /// Declared capabilities of the hot-reload API.
    pub capabilities: RuntimeCapabilities,
}

impl Default for RuntimeAdapter {
    fn default() -> Self {
        Self {
            framework: "vue".to_string(),
            component_base: "Vue".to_string(),
            hot_reload_api: "vue-hot-reload-api".to_string(),
            update_module: "ud".to_string(),
            helper_fallback_dir: "vue-tsify/node_modules".to_string(),
            capabilities: RuntimeCapabilities::default(),
        }
    }
}

/// How a live component record is updated after a swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HmrStrategy {
    /// `rerender` for render-only changes, `reload` otherwise.
    RerenderReload,
    /// Single `update` call with the new template.
    Update,
}

impl HmrStrategy {
    /// Pick the strategy from declared capabilities.
    pub fn select(capabilities: &RuntimeCapabilities) -> Self {
        if capabilities.rerender && capabilities.reload {
            Self::RerenderReload
        } else {
            Self::Update
        }
    }
}

/// Which bootstrap template wraps the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HmrTemplate {
    /// Framework components only.
    Component,
    /// Components, plus plain functions and objects via the update module.
    Universal,
}

impl HmrTemplate {
    /// Pick the template from declared capabilities.
    pub fn select(capabilities: &RuntimeCapabilities) -> Self {
        if capabilities.wraps_plain_modules {
            Self::Universal
        } else {
            Self::Component
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

const COMPONENT_TEMPLATE: &str = "\
if (module.hot) {
\tvar hmrAPI = require('HOTRELOADAPI');
\thmrAPI.install(require('FRAMEWORK'), true);
\tif (!hmrAPI.compatible) {
\t\tconsole.warn('HOTRELOADNAME is not compatible with the installed FRAMEWORK version.');
\t} else {
\t\tif (module.exports.__esModule) module.exports = module.exports.default;
\t\tmodule.hot.accept();
RECORD_BLOCK\
\t}
}
";

const UNIVERSAL_TEMPLATE: &str = "\
if (module.hot) {
\tvar hmrAPI = require('HOTRELOADAPI');
\thmrAPI.install(require('FRAMEWORK'), true);
\tif (!hmrAPI.compatible) {
\t\tconsole.warn('HOTRELOADNAME is not compatible with the installed FRAMEWORK version.');
\t} else {
\t\tif (module.exports.__esModule) module.exports = module.exports.default;
\t\tif (typeof module.exports === 'function') {
\t\t\tif (module.exports.super && module.exports.super.name === 'COMPONENT_BASE') {
\t\t\t\tmodule.hot.accept();
RECORD_BLOCK\
\t\t\t} else {
\t\t\t\tmodule.exports = require('UDMODULE').defn(module, module.exports);
\t\t\t}
\t\t} else {
\t\t\tmodule.exports = require('UDMODULE').defobj(module, module.exports);
\t\t}
\t}
}
";

const RERENDER_RELOAD_BLOCK: &[&str] = &[
    "if (!module.hot.data) {",
    "\thmrAPI.createRecord('COMP_ID', module.exports);",
    "} else if (module.exports.options.render || module.exports.options.template) {",
    "\thmrAPI.rerender('COMP_ID', module.exports);",
    "} else {",
    "\thmrAPI.reload('COMP_ID', module.exports);",
    "}",
];

const UPDATE_BLOCK: &[&str] = &[
    "if (!module.hot.data) {",
    "\thmrAPI.createRecord('COMP_ID', module.exports);",
    "} else {",
    "\thmrAPI.update('COMP_ID', module.exports, module.exports.options.template);",
    "}",
];

fn record_block(strategy: HmrStrategy, depth: usize) -> String {
    let lines = match strategy {
        HmrStrategy::RerenderReload => RERENDER_RELOAD_BLOCK,
        HmrStrategy::Update => UPDATE_BLOCK,
    };
    let indent = "\t".repeat(depth);
    lines.iter().map(|line| format!("{indent}{line}\n")).collect()
}

/// Module reference for a runtime helper: the bare name when installed at
/// top level under `current_dir`, otherwise nested under the fallback dir.
pub fn helper_location(current_dir: &Path, fallback_dir: &str, name: &str) -> String {
    if current_dir.join("node_modules").join(name).exists() {
        name.to_string()
    } else {
        format!("{}/{name}", fallback_dir.trim_end_matches('/'))
    }
}

/// Deterministic component identity derived from the source path.
///
/// Stable across rebuilds and process restarts.
pub fn component_id(source: &CanonicalPath) -> String {
    format!("{:016x}", xxh3_64(source.as_str().as_bytes()))
}

/// Insert `snippet` before the source-map marker, or append it.
pub fn splice(text: &str, snippet: &str) -> String {
    match text.find(SOURCE_MAP_MARKER) {
        Some(at) => {
            let mut out = String::with_capacity(text.len() + snippet.len());
            out.push_str(&text[..at]);
            out.push_str(snippet);
            out.push_str(&text[at..]);
            out
        }
        None => format!("{}\n{snippet}", text.trim()),
    }
}

// =============================================================================
// Exclusion Globs
// =============================================================================

/// Glob list matched the way the `matchBase` option of shell globbing does:
/// patterns without a `/` match the basename anywhere.
#[derive(Debug, Clone)]
pub struct ExcludeMatcher {
    basename: GlobSet,
    full: GlobSet,
}

impl ExcludeMatcher {
    /// Compile the exclusion patterns.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, HostError> {
        let mut basename = GlobSetBuilder::new();
        let mut full = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            if pattern.contains('/') {
                full.add(GlobBuilder::new(pattern).literal_separator(true).build()?);
            } else {
                basename.add(Glob::new(pattern)?);
            }
        }
        Ok(Self {
            basename: basename.build()?,
            full: full.build()?,
        })
    }

    /// Whether `name` matches any pattern.
    pub fn is_match(&self, name: &str) -> bool {
        let name = normalize_slashes(name);
        let base = name.rsplit('/').next().unwrap_or(&name);
        self.basename.is_match(base) || self.full.is_match(&name)
    }
}

// =============================================================================
// HmrInjector
// =============================================================================

/// Splices the rendered bootstrap into emitted module text.
#[derive(Debug, Clone)]
pub struct HmrInjector {
    bootstrap: String,
    strategy: HmrStrategy,
    template: HmrTemplate,
    exclude: ExcludeMatcher,
}

impl HmrInjector {
    /// Render the bootstrap for `adapter`, resolving helper references
    /// against `current_dir`.
    pub fn new<S: AsRef<str>>(
        adapter: &RuntimeAdapter,
        current_dir: &Path,
        exclude: &[S],
    ) -> Result<Self, HostError> {
        let strategy = HmrStrategy::select(&adapter.capabilities);
        let template = HmrTemplate::select(&adapter.capabilities);
        let (text, depth) = match template {
            HmrTemplate::Component => (COMPONENT_TEMPLATE, 2),
            HmrTemplate::Universal => (UNIVERSAL_TEMPLATE, 4),
        };

        let locate = |name: &str| helper_location(current_dir, &adapter.helper_fallback_dir, name);
        let bootstrap = text
            .replace("RECORD_BLOCK", &record_block(strategy, depth))
            .replace("HOTRELOADAPI", &locate(&adapter.hot_reload_api))
            .replace("HOTRELOADNAME", &adapter.hot_reload_api)
            .replace("UDMODULE", &locate(&adapter.update_module))
            .replace("COMPONENT_BASE", &adapter.component_base)
            .replace("FRAMEWORK", &adapter.framework);

        tracing::debug!(?strategy, ?template, "Hot-reload bootstrap prepared");
        Ok(Self {
            bootstrap,
            strategy,
            template,
            exclude: ExcludeMatcher::new(exclude)?,
        })
    }

    /// The strategy chosen at construction.
    pub fn strategy(&self) -> HmrStrategy {
        self.strategy
    }

    /// The template chosen at construction.
    pub fn template(&self) -> HmrTemplate {
        self.template
    }

    /// Declaration outputs and excluded names get no bootstrap.
    pub fn applies_to(&self, output: &CanonicalPath, logical_name: &str) -> bool {
        !output.as_str().ends_with(".d.ts") && !self.exclude.is_match(logical_name)
    }

    /// Bootstrap text for one component.
    pub fn snippet(&self, id: &str) -> String {
        self.bootstrap.replace("COMP_ID", id)
    }

    /// Splice the bootstrap for `id` into `text`.
    pub fn inject(&self, text: &str, id: &str) -> String {
        splice(text, &self.snippet(id))
    }
}
