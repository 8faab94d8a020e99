//! Host error type.

use thiserror::Error;

use super::info::Diagnostics;

/// Error type for host construction and compile passes.
///
/// Absorb-and-continue situations (missing sources, missing component
/// resources, markup warnings) never surface here.
///
/// # Example
///
/// ```ignore
/// match host.run_compile() {
///     Ok(summary) => { /* artifacts are in the output store */ }
///     Err(HostError::BuildFailed { diagnostics }) => {
///         for diag in diagnostics.errors() {
///             eprintln!("{diag}");
///         }
///     }
///     Err(e) => eprintln!("{e}"),
/// }
/// ```
#[derive(Debug, Error)]
pub enum HostError {
    /// The engine reported at least one fatal diagnostic during the pass.
    #[error("build failed: {}", diagnostics.summary())]
    BuildFailed {
        /// Every diagnostic reported during the failed pass.
        diagnostics: Diagnostics,
    },

    /// Markup minify overrides could not be merged into the option set.
    #[error("invalid markup minify options: {0}")]
    MinifyOptions(#[from] serde_json::Error),

    /// A hot-reload exclusion pattern is not a valid glob.
    #[error("invalid hot-reload exclusion pattern: {0}")]
    ExcludePattern(#[from] globset::Error),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HostError {
    /// Check if this error carries fatal diagnostics (vs a setup failure).
    pub fn has_fatal_errors(&self) -> bool {
        match self {
            Self::BuildFailed { diagnostics } => diagnostics.has_errors(),
            _ => true,
        }
    }

    /// Get the diagnostics if this is a build failure.
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            Self::BuildFailed { diagnostics } => Some(diagnostics),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Diagnostic;

    #[test]
    fn test_build_failed_message() {
        let diagnostics: Diagnostics = [Diagnostic::error("x"), Diagnostic::error("y")].into_iter().collect();
        let err = HostError::BuildFailed { diagnostics };
        assert_eq!(err.to_string(), "build failed: 2 errors");
        assert!(err.has_fatal_errors());
        assert_eq!(err.diagnostics().map(Diagnostics::len), Some(2));
    }
}
