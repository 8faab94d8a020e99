//! Prelude module for convenient imports.
//!
//! ```ignore
//! use tsify_host::prelude::*;
//! ```

// Host
pub use crate::host::{
    CompileMode, CompileSummary, CompilerEngine, CompilerHost, EngineCapabilities, Host,
    HostBuilder,
};

// Configuration
pub use crate::config::{ConfigBuilder, HostConfig, TargetVersion};
pub use crate::preprocess::Preprocess;

// Diagnostics
pub use crate::diagnostic::{Diagnostic, Diagnostics, HostError, Severity};

// Paths
pub use crate::path::{CanonicalPath, PathMapper};

// Artifacts
pub use crate::artifact::{MarkupMinifier, MarkupValidator, RuntimeAdapter, RuntimeCapabilities};
