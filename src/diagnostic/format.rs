//! Diagnostic formatting utilities.

use std::fmt::Write;

use super::info::{Diagnostic, Severity};

// ============================================================================
// Options
// ============================================================================

/// Options for controlling diagnostic formatting.
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticOptions {
    /// Whether to use ANSI colors in output.
    pub colored: bool,
    /// Whether to append a count summary line.
    pub summary: bool,
}

impl Default for DiagnosticOptions {
    fn default() -> Self {
        Self {
            colored: true,
            summary: true,
        }
    }
}

impl DiagnosticOptions {
    /// Create options for colored terminal output.
    pub fn colored() -> Self {
        Self::default()
    }

    /// Create options for plain text output (no colors).
    pub fn plain() -> Self {
        Self {
            colored: false,
            ..Self::default()
        }
    }

    /// Enable or disable colors.
    pub fn with_color(mut self, colored: bool) -> Self {
        self.colored = colored;
        self
    }

    /// Enable or disable the trailing summary line.
    pub fn with_summary(mut self, summary: bool) -> Self {
        self.summary = summary;
        self
    }
}

// ============================================================================
// Coloring
// ============================================================================

/// Apply color to text based on severity.
#[cfg(feature = "colored-diagnostics")]
fn colorize(text: &str, severity: Severity) -> String {
    use owo_colors::OwoColorize;
    match severity {
        Severity::Error => text.red().to_string(),
        Severity::Warning => text.yellow().to_string(),
        Severity::Message => text.cyan().to_string(),
    }
}

#[cfg(not(feature = "colored-diagnostics"))]
fn colorize(text: &str, _severity: Severity) -> String {
    text.to_owned()
}

// ============================================================================
// Formatting
// ============================================================================

/// Format diagnostics with colored output.
pub fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    format_diagnostics_with_options(diagnostics, DiagnosticOptions::default())
}

/// Format diagnostics one per line: `file:line: severity: message`.
pub fn format_diagnostics_with_options(diagnostics: &[Diagnostic], options: DiagnosticOptions) -> String {
    let mut out = String::new();
    for diag in diagnostics {
        match (&diag.file, diag.line) {
            (Some(file), Some(line)) => {
                let _ = write!(out, "{file}:{line}: ");
            }
            (Some(file), None) => {
                let _ = write!(out, "{file}: ");
            }
            _ => {}
        }
        let label = diag.severity.to_string();
        if options.colored {
            out.push_str(&colorize(&label, diag.severity));
        } else {
            out.push_str(&label);
        }
        let _ = writeln!(out, ": {}", diag.message);
    }

    if options.summary && !diagnostics.is_empty() {
        let summary = super::info::DiagnosticSummary::from_diagnostics(diagnostics);
        let _ = writeln!(out, "{summary}");
    }
    out
}


#[cfg(all(test, feature = "colored-diagnostics"))]
mod color_tests {
    use super::*;

    #[test]
    fn test_colored_contains_label() {
        let diags = vec![Diagnostic::error("boom")];
        let out = format_diagnostics_with_options(&diags, DiagnosticOptions::colored().with_summary(false));
        assert!(out.contains("error"));
        assert!(out.ends_with(": boom\n"));
    }
}
