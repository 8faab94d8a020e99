//! The compile orchestrator.
//!
//! # Pass Lifecycle
//!
//! ```text
//! run_compile()
//!   ├── reset()                      cache rotates, outputs cleared, error flag cleared
//!   ├── add_file(root, true)         for every configured root
//!   ├── compile(roots, Discover)     only if the engine needs explicit dependency roots
//!   ├── compile(roots + deps, Emit)  engine calls back into source_file / write_file
//!   └── error flag set?              → HostError::BuildFailed
//!
//! request_artifact(name)             OutputStore read + hot-reload injection
//! ```

use std::fs;
use std::path::Path;
use std::rc::Rc;

use crate::artifact::{component_id, ArtifactPostProcessor};
use crate::config::{HostConfig, TargetVersion};
use crate::diagnostic::{Diagnostic, Diagnostics, HostError};
use crate::file::{FileVersionCache, Generation};
use crate::output::OutputStore;
use crate::path::{dirname, join, normalize_slashes, relative, CanonicalPath, DirectoryRoots, PathMapper};
use crate::preprocess::SourceKind;

use super::builder::HostBuilder;
use super::contract::{CompileMode, CompilerEngine, CompilerHost, DEFAULT_LIB_NAME};

/// Outcome of a successful [`Host::run_compile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileSummary {
    /// Generation the pass ran in.
    pub generation: Generation,
    /// Canonical root paths compiled, sorted.
    pub roots: Vec<CanonicalPath>,
    /// Dependency modules added as explicit roots by the discovery phase.
    pub dependency_modules: Vec<CanonicalPath>,
    /// Non-fatal diagnostics of the pass.
    pub diagnostics: Diagnostics,
}

/// Incremental compiler host.
///
/// Owns the parsed-file cache, the output store and the artifact
/// post-processor for one source/output tree pair. One pass runs at a time.
pub struct Host<E: CompilerEngine> {
    engine: Rc<E>,
    target: TargetVersion,
    two_phase: bool,
    mapper: PathMapper,
    cache: FileVersionCache<E::SourceFile>,
    output: OutputStore,
    post: ArtifactPostProcessor,
    roots: Vec<String>,
    default_lib: Option<Rc<E::SourceFile>>,
    diagnostics: Diagnostics,
    failed: bool,
}

impl<E: CompilerEngine> Host<E> {
    /// Create a builder for `engine` configured by `config`.
    pub fn builder(engine: E, config: HostConfig) -> HostBuilder<E> {
        HostBuilder::new(engine, config)
    }

    pub(crate) fn new(
        engine: E,
        target: TargetVersion,
        mapper: PathMapper,
        cache: FileVersionCache<E::SourceFile>,
        post: ArtifactPostProcessor,
        roots: Vec<String>,
    ) -> Self {
        let two_phase = engine.capabilities().requires_explicit_dependency_roots;
        Self {
            engine: Rc::new(engine),
            target,
            two_phase,
            mapper,
            cache,
            output: OutputStore::new(),
            post,
            roots,
            default_lib: None,
            diagnostics: Diagnostics::new(),
            failed: false,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The wrapped engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The fixed source, output and working directories.
    pub fn roots(&self) -> &DirectoryRoots {
        self.mapper.roots()
    }

    /// Source/output path mapping.
    pub fn mapper(&self) -> &PathMapper {
        &self.mapper
    }

    /// The parsed-file cache.
    pub fn cache(&self) -> &FileVersionCache<E::SourceFile> {
        &self.cache
    }

    /// Artifacts emitted by the current pass, before read-time injection.
    pub fn output(&self) -> &OutputStore {
        &self.output
    }

    /// Rewriting, inlining and hot-reload state.
    pub fn post_processor(&self) -> &ArtifactPostProcessor {
        &self.post
    }

    /// The current generation.
    pub fn generation(&self) -> Generation {
        self.cache.generation()
    }

    /// Whether a fatal diagnostic was reported in the current generation.
    pub fn has_errors(&self) -> bool {
        self.failed
    }

    /// Diagnostics reported in the current generation.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Whether passes discover dependency modules before emitting.
    pub fn is_two_phase(&self) -> bool {
        self.two_phase
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Replace the root file names compiled by [`run_compile`](Self::run_compile).
    pub fn set_roots<I, S>(&mut self, roots: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roots = roots.into_iter().map(Into::into).collect();
    }

    /// Serve `source_file` whenever the engine asks for `__lib.d.ts`.
    pub fn set_default_library(&mut self, source_file: E::SourceFile) {
        self.default_lib = Some(Rc::new(source_file));
    }

    /// Call `listener` with the canonical path and relative name of every
    /// file registered or reused from now on.
    pub fn on_file(&mut self, listener: impl FnMut(&CanonicalPath, &str) + 'static) {
        self.cache.subscribe(Box::new(listener));
    }

    // =========================================================================
    // Generation Lifecycle
    // =========================================================================

    /// Start a new generation.
    ///
    /// Rotates the file cache, drops every stored artifact and clears the
    /// error flag together with the collected diagnostics.
    pub fn reset(&mut self) {
        self.cache.reset();
        self.output.clear();
        self.diagnostics.clear();
        self.failed = false;
        tracing::debug!(generation = self.cache.generation(), "Resetting source files");
    }

    /// Read `name` from disk and register it in the current generation.
    ///
    /// Bytes that are not valid UTF-8 are replaced rather than rejected.
    ///
    /// Returns `None` when the file cannot be read; nothing is recorded and
    /// the engine sees its usual not-found behavior.
    pub fn add_file(&mut self, name: &str, root: bool) -> Option<Rc<E::SourceFile>> {
        let canonical = self.mapper.canonicalize(name);
        let contents = match fs::read(canonical.as_str()) {
            Ok(bytes) => String::from_utf8(bytes)
                .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned()),
            Err(err) => {
                tracing::debug!(path = %canonical, error = %err, "Source file not readable");
                return None;
            }
        };
        let relative_name = relative(self.mapper.roots().current_dir.as_str(), canonical.as_str());

        let engine = &self.engine;
        let post = &self.post;
        let target = self.target;
        let parsed = self.cache.add_or_reuse(canonical, relative_name, contents, root, |name, raw| {
            tracing::trace!(name, "Parsing source file");
            engine.parse(name, &post.preprocess(raw, SourceKind::Script), target)
        });
        Some(parsed)
    }

    /// Parsed source for `name`: the current generation's record if present,
    /// otherwise a fresh non-root registration.
    pub fn resolve_file(&mut self, name: &str) -> Option<Rc<E::SourceFile>> {
        if name == DEFAULT_LIB_NAME {
            return self.default_lib.clone();
        }
        let canonical = self.mapper.canonicalize(name);
        match self.cache.get(canonical.as_str()) {
            Some(record) => Some(Rc::clone(record.parsed())),
            None => self.add_file(name, false),
        }
    }

    /// Run one full compile pass over the configured roots.
    ///
    /// Fails with [`HostError::BuildFailed`] when the engine reported a
    /// fatal diagnostic. Artifacts emitted before the failure stay readable
    /// until the next reset.
    pub fn run_compile(&mut self) -> Result<CompileSummary, HostError> {
        self.reset();
        for name in self.roots.clone() {
            self.add_file(&name, true);
        }

        let roots = self.cache.root_paths();
        tracing::debug!(count = roots.len(), "Compiling files:");
        for root in &roots {
            tracing::debug!("  {root}");
        }

        let engine = Rc::clone(&self.engine);
        let mut program_roots: Vec<String> = roots.iter().map(|root| root.to_string()).collect();
        let mut dependency_modules = Vec::new();

        if self.two_phase {
            let reported = engine.compile(&program_roots, CompileMode::Discover, self);
            self.record_all(reported);

            dependency_modules = self.cache.dependency_module_paths();
            tracing::debug!("  + {} file(s) found in node_modules", dependency_modules.len());
            program_roots.extend(dependency_modules.iter().map(|path| path.to_string()));
        }

        let reported = engine.compile(&program_roots, CompileMode::Emit, self);
        self.record_all(reported);

        if self.failed {
            tracing::debug!(summary = %self.diagnostics.summary(), "Compile failed");
            return Err(HostError::BuildFailed {
                diagnostics: self.diagnostics.clone(),
            });
        }

        Ok(CompileSummary {
            generation: self.cache.generation(),
            roots,
            dependency_modules,
            diagnostics: self.diagnostics.clone(),
        })
    }

    fn record_all(&mut self, diagnostics: Vec<Diagnostic>) {
        for diagnostic in diagnostics {
            self.record(diagnostic);
        }
    }

    fn record(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_fatal() {
            self.failed = true;
        }
        self.diagnostics.push(diagnostic);
    }

    // =========================================================================
    // Consumer Retrieval
    // =========================================================================

    /// Emitted text for `logical_name`, a path in the source tree with the
    /// output extension (e.g. `src/c.js`), with the hot-reload bootstrap
    /// spliced in when it applies.
    ///
    /// `None` is a normal miss: declaration-only inputs emit nothing.
    pub fn request_artifact(&self, logical_name: &str) -> Option<String> {
        let output = self.mapper.to_output_path(logical_name);
        tracing::debug!(path = %output, "Cache read");

        let Some(text) = self.output.get(&output) else {
            tracing::debug!(path = %output, "Cache miss");
            return None;
        };
        let text = text.to_string();
        let source = self.mapper.canonicalize(logical_name);
        Some(self.post.inject_hot_reload(text, &output, logical_name, &source))
    }

    /// Load a resource referenced from an emitted artifact.
    ///
    /// `.html` files are preprocessed, validated and minified; `.css` files
    /// are minified if configured; anything else is returned as is. A missing
    /// file yields empty text.
    pub fn inline_resource(&self, path: impl AsRef<Path>) -> String {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("html") => self.post.inline_markup(path),
            Some("css") => self.post.inline_stylesheet(path),
            _ => fs::read_to_string(path).unwrap_or_default(),
        }
    }

    /// Whether `render` differs from the render last recorded for the
    /// component built from `logical_name`, recording it either way.
    pub fn render_changed(&mut self, logical_name: &str, render: &str) -> bool {
        let id = component_id(&self.mapper.canonicalize(logical_name));
        self.post.render_changed(&id, render)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Canonical paths of the current generation's roots.
    pub fn root_files(&self) -> Vec<CanonicalPath> {
        self.cache.root_paths()
    }

    /// Canonical paths of the current generation's dependency modules.
    pub fn dependency_modules(&self) -> Vec<CanonicalPath> {
        self.cache.dependency_module_paths()
    }

    /// Every file registered or reused in the current generation.
    pub fn observed_files(&self) -> Vec<CanonicalPath> {
        self.cache.observed_paths()
    }
}

// =============================================================================
// Engine-Facing Contract
// =============================================================================

impl<E: CompilerEngine> CompilerHost for Host<E> {
    type SourceFile = E::SourceFile;

    fn source_file(&mut self, name: &str) -> Option<Rc<E::SourceFile>> {
        self.resolve_file(name)
    }

    fn default_lib_file_name(&self) -> String {
        let dir = self.engine.lib_directory();
        let name = self.engine.default_lib_file_name(self.target);
        join(&normalize_slashes(&dir.to_string_lossy()), &name)
    }

    fn write_file(&mut self, name: &str, data: &str) {
        let source = self.mapper.to_source_path(self.mapper.canonicalize(name));
        let source_dir = dirname(source.as_str());
        let rewritten = self.post.rewrite_references(data, Path::new(source_dir));
        self.output.write(&self.mapper, name, &rewritten);
    }

    fn current_directory(&self) -> &str {
        self.mapper.roots().current_dir.as_str()
    }

    fn canonical_file_name(&self, name: &str) -> String {
        self.mapper.canonicalizer().canonical_file_name(name)
    }

    fn use_case_sensitive_file_names(&self) -> bool {
        self.mapper.canonicalizer().case_sensitive()
    }

    fn new_line(&self) -> &'static str {
        if cfg!(windows) { "\r\n" } else { "\n" }
    }

    fn file_exists(&self, name: &str) -> bool {
        Path::new(name).is_file()
    }

    fn read_file(&self, name: &str) -> Option<String> {
        fs::read_to_string(name).ok()
    }

    fn directory_exists(&self, name: &str) -> bool {
        Path::new(name).is_dir()
    }

    fn directories(&self, name: &str) -> Vec<String> {
        let Ok(entries) = fs::read_dir(name) else {
            return Vec::new();
        };
        let mut dirs: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|ty| ty.is_dir()))
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        dirs.sort();
        dirs
    }

    fn environment_variable(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn realpath(&self, name: &str) -> std::io::Result<String> {
        let real = fs::canonicalize(name)?;
        Ok(normalize_slashes(&real.to_string_lossy()))
    }

    fn trace(&self, message: &str) {
        tracing::info!(target: "tsify_host::engine", "{message}");
    }

    fn report_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.record(diagnostic);
    }
}

impl<E: CompilerEngine> std::fmt::Debug for Host<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("roots", self.mapper.roots())
            .field("two_phase", &self.two_phase)
            .field("cache", &self.cache)
            .field("outputs", &self.output.len())
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::host::EngineCapabilities;
    use std::cell::Cell;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Engine that parses to `(name, text)` and emits nothing.
    struct EchoEngine {
        parses: Cell<usize>,
    }

    impl CompilerEngine for EchoEngine {
        type SourceFile = (String, String);

        fn capabilities(&self) -> EngineCapabilities {
            EngineCapabilities::default()
        }

        fn parse(&self, file_name: &str, text: &str, _target: TargetVersion) -> Self::SourceFile {
            self.parses.set(self.parses.get() + 1);
            (file_name.to_string(), text.to_string())
        }

        fn default_lib_file_name(&self, target: TargetVersion) -> String {
            format!("lib.{}.d.ts", target.as_str())
        }

        fn lib_directory(&self) -> PathBuf {
            PathBuf::from("/engine/lib")
        }

        fn compile(
            &self,
            _roots: &[String],
            _mode: CompileMode,
            _host: &mut dyn CompilerHost<SourceFile = Self::SourceFile>,
        ) -> Vec<Diagnostic> {
            Vec::new()
        }
    }

    fn host(dir: &TempDir) -> Host<EchoEngine> {
        let config = ConfigBuilder::new()
            .current_dir(dir.path())
            .root_dir("src")
            .out_dir("dist")
            .case_sensitive(true)
            .hmr(false)
            .build();
        Host::builder(EchoEngine { parses: Cell::new(0) }, config).build().unwrap()
    }

    #[test]
    fn test_add_file_missing_is_skipped() {
        let dir = TempDir::new().unwrap();
        let mut host = host(&dir);
        host.reset();
        assert!(host.add_file("src/missing.ts", true).is_none());
        assert!(host.root_files().is_empty());
    }

    #[test]
    fn test_add_file_uses_relative_name() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/a.ts"), "export const a = 1;").unwrap();
        let mut host = host(&dir);
        host.reset();

        let parsed = host.add_file("src/a.ts", true).unwrap();
        assert_eq!(parsed.0, "src/a.ts");
        assert_eq!(host.engine().parses.get(), 1);
    }

    #[test]
    fn test_add_file_accepts_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/latin1.ts"), b"const s = '\xe9t\xe9';").unwrap();
        let mut host = host(&dir);
        host.reset();

        let parsed = host.add_file("src/latin1.ts", true).unwrap();
        assert_eq!(parsed.1, "const s = '\u{fffd}t\u{fffd}';");
        assert_eq!(host.root_files().len(), 1);
    }

    #[test]
    fn test_resolve_file_prefers_current_generation() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/a.ts"), "1").unwrap();
        let mut host = host(&dir);
        host.reset();

        let first = host.resolve_file("src/a.ts").unwrap();
        fs::write(dir.path().join("src/a.ts"), "2").unwrap();
        let second = host.resolve_file("src/a.ts").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_default_library_name() {
        let dir = TempDir::new().unwrap();
        let mut host = host(&dir);
        assert_eq!(host.default_lib_file_name(), "/engine/lib/lib.es5.d.ts");
        assert!(host.resolve_file(DEFAULT_LIB_NAME).is_none());

        host.set_default_library(("lib".to_string(), String::new()));
        assert!(host.resolve_file(DEFAULT_LIB_NAME).is_some());
    }

    #[test]
    fn test_reset_clears_error_flag() {
        let dir = TempDir::new().unwrap();
        let mut host = host(&dir);
        host.report_diagnostic(Diagnostic::warning("unused"));
        assert!(!host.has_errors());
        host.report_diagnostic(Diagnostic::error("boom"));
        assert!(host.has_errors());
        assert_eq!(host.diagnostics().len(), 2);

        host.reset();
        assert!(!host.has_errors());
        assert!(host.diagnostics().is_empty());
    }

    #[test]
    fn test_inline_resource_dispatch() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("c.html"), "<div>\n  <!-- x -->\n  <span>hi</span>\n</div>").unwrap();
        fs::write(dir.path().join("c.txt"), "raw  text").unwrap();
        let host = host(&dir);

        assert_eq!(host.inline_resource(dir.path().join("c.html")), "<div><span>hi</span></div>");
        assert_eq!(host.inline_resource(dir.path().join("c.txt")), "raw  text");
        assert_eq!(host.inline_resource(dir.path().join("c.css")), "");
    }

    #[test]
    fn test_directories_lists_subdirectories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("file.ts"), "").unwrap();
        let host = host(&dir);

        let name = dir.path().to_string_lossy().into_owned();
        assert_eq!(host.directories(&name), vec!["a".to_string(), "b".to_string()]);
        assert!(host.directory_exists(&name));
        assert!(!host.file_exists(&name));
    }
}
