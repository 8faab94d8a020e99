//! # tsify-host
//!
//! An incremental compiler host for a TypeScript-like type-checking engine,
//! built for bundler plugins that compile single-file components.
//!
//! The engine itself is external: it plugs in through [`CompilerEngine`] and
//! talks back through [`CompilerHost`]. This crate provides everything around
//! it:
//!
//! - **Parsed-file reuse**: two-generation cache, unchanged files are never
//!   reparsed across passes
//! - **Path handling**: canonical keys, case-folding on case-insensitive file
//!   systems, symlink resolution, source/output tree mapping
//! - **Artifact post-processing**: `templateUrl`/`styleUrl` rewrite, markup and
//!   stylesheet inlining, hot-reload bootstrap injection
//! - **Preprocessing**: `@if`/`@ifdef`/`@echo` directives in sources and markup
//!
//! ## Quick Start
//!
//! ```ignore
//! use tsify_host::prelude::*;
//!
//! let config = ConfigBuilder::new().root_dir("src").out_dir("dist").build();
//! let mut host = Host::builder(MyEngine::new(), config)
//!     .with_roots(["src/main.ts"])
//!     .build()?;
//!
//! let summary = host.run_compile()?;
//! let js = host.request_artifact("src/main.js");
//! ```
//!
//! ## Modules
//!
//! - [`host`]: orchestrator and engine contract
//! - [`mod@file`]: generation-based parsed-file cache
//! - [`output`]: emitted artifact store
//! - [`path`]: canonicalization and tree mapping
//! - [`artifact`]: rewrite, inlining and hot reload
//! - [`preprocess`]: directive preprocessing
//! - [`config`]: host configuration
//! - [`diagnostic`]: diagnostics and errors

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod artifact;
pub mod config;
pub mod diagnostic;
pub mod file;
pub mod host;
pub mod output;
pub mod path;
pub mod prelude;
pub mod preprocess;

// =============================================================================
// Host
// =============================================================================

pub use host::{
    CompileMode, CompileSummary, CompilerEngine, CompilerHost, EngineCapabilities, Host,
    HostBuilder, DEFAULT_LIB_NAME,
};

// =============================================================================
// Configuration
// =============================================================================

pub use config::{ConfigBuilder, HostConfig, TargetVersion};
pub use preprocess::{Preprocess, Preprocessor, SourceKind};

// =============================================================================
// Caches
// =============================================================================

pub use file::{FileRecord, FileVersionCache, Generation};
pub use output::OutputStore;
pub use path::{CanonicalPath, DirectoryRoots, PathCanonicalizer, PathMapper};

// =============================================================================
// Artifacts
// =============================================================================

pub use artifact::{
    ArtifactPostProcessor, BasicMinifier, HmrStrategy, HmrTemplate, HtmlMinifyOptions,
    MarkupMinifier, MarkupValidator, NoValidation, RenderTracker, RuntimeAdapter,
    RuntimeCapabilities,
};

// =============================================================================
// Diagnostics
// =============================================================================

pub use diagnostic::{
    format_diagnostics, format_diagnostics_with_options, Diagnostic, DiagnosticOptions,
    DiagnosticSummary, Diagnostics, HostError, Severity,
};
