//! Diagnostics reported by the compiler engine, and the crate error type.

mod error;
mod format;
mod info;

pub use error::HostError;
pub use format::{format_diagnostics, format_diagnostics_with_options, DiagnosticOptions};
pub use info::{Diagnostic, DiagnosticSummary, Diagnostics, Severity};
