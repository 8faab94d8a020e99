//! The two sides of the engine boundary.
//!
//! ```text
//! ┌──────────────┐  compile(roots, mode, host)  ┌──────────────────┐
//! │     Host     │ ───────────────────────────► │  CompilerEngine  │
//! │              │ ◄─────────────────────────── │                  │
//! └──────────────┘  source_file / write_file /  └──────────────────┘
//!                   file_exists / ... (CompilerHost)
//! ```

use std::path::PathBuf;
use std::rc::Rc;

use crate::config::TargetVersion;
use crate::diagnostic::Diagnostic;

/// File name the engine uses to ask for the pre-registered default library.
pub const DEFAULT_LIB_NAME: &str = "__lib.d.ts";

// =============================================================================
// Engine Side
// =============================================================================

/// What the engine adapter declares about itself, read once at host
/// construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineCapabilities {
    /// Every transitively visited dependency module must be listed as an
    /// explicit program root for declaration emit to be correct. Enables
    /// the two-phase compile.
    pub requires_explicit_dependency_roots: bool,
}

/// What a single `compile` call should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileMode {
    /// Build the program to discover dependency files; emit nothing.
    Discover,
    /// Build the program and emit through the host's write sink.
    Emit,
}

/// Adapter around the external type-checking compiler.
pub trait CompilerEngine {
    /// The engine's parsed source file representation.
    type SourceFile;

    /// Capabilities of this engine version.
    fn capabilities(&self) -> EngineCapabilities;

    /// Parse `text` into a source file named `file_name`.
    fn parse(&self, file_name: &str, text: &str, target: TargetVersion) -> Self::SourceFile;

    /// File name of the default library for `target` (e.g. `lib.es5.d.ts`).
    fn default_lib_file_name(&self, target: TargetVersion) -> String;

    /// Directory the engine's bundled libraries live in.
    fn lib_directory(&self) -> PathBuf;

    /// Build a program over `roots`, querying `host` synchronously, and
    /// return the diagnostics of the pass.
    fn compile(
        &self,
        roots: &[String],
        mode: CompileMode,
        host: &mut dyn CompilerHost<SourceFile = Self::SourceFile>,
    ) -> Vec<Diagnostic>;
}

// =============================================================================
// Host Side
// =============================================================================

/// The synchronous queries an engine issues during a pass.
pub trait CompilerHost {
    /// The engine's parsed source file representation.
    type SourceFile;

    /// Parsed source for `name`, registering it on first request.
    /// `None` when the file cannot be read.
    fn source_file(&mut self, name: &str) -> Option<Rc<Self::SourceFile>>;

    /// Full path of the engine's default library.
    fn default_lib_file_name(&self) -> String;

    /// Emit sink.
    fn write_file(&mut self, name: &str, data: &str);

    /// Canonical working directory.
    fn current_directory(&self) -> &str;

    /// Separator-normalized, case-folded-if-insensitive form of `name`.
    fn canonical_file_name(&self, name: &str) -> String;

    /// Whether file names are case-sensitive.
    fn use_case_sensitive_file_names(&self) -> bool;

    /// Platform line terminator.
    fn new_line(&self) -> &'static str;

    /// Whether `name` is an existing file.
    fn file_exists(&self, name: &str) -> bool;

    /// Contents of `name`, if readable as UTF-8.
    fn read_file(&self, name: &str) -> Option<String>;

    /// Whether `name` is an existing directory.
    fn directory_exists(&self, name: &str) -> bool;

    /// Names of the subdirectories of `name`.
    fn directories(&self, name: &str) -> Vec<String>;

    /// Value of an environment variable.
    fn environment_variable(&self, name: &str) -> Option<String>;

    /// Real path of `name` with every symlink resolved.
    fn realpath(&self, name: &str) -> std::io::Result<String>;

    /// Engine trace output.
    fn trace(&self, message: &str);

    /// Record a diagnostic; fatal ones mark the current generation failed.
    fn report_diagnostic(&mut self, diagnostic: Diagnostic);
}
