//! Component resource inlining (markup templates and stylesheets).
//!
//! Missing resources yield empty text so half-authored components still
//! build.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::minify::{HtmlMinifyOptions, MarkupMinifier, MarkupValidator};
use crate::preprocess::{Preprocessor, SourceKind};

// =============================================================================
// Markup
// =============================================================================

/// Everything markup inlining needs, borrowed from the post-processor.
pub struct MarkupPipeline<'a> {
    /// Directive preprocessing, if enabled.
    pub preprocessor: Option<&'a Preprocessor>,
    /// Structural validation; warnings are logged only.
    pub validator: &'a dyn MarkupValidator,
    /// The minifier and its fixed option set.
    pub minifier: &'a dyn MarkupMinifier,
    /// Options passed to the minifier.
    pub options: &'a HtmlMinifyOptions,
}

/// Load, preprocess, validate and minify a markup template.
pub fn inline_markup(path: &Path, pipeline: &MarkupPipeline<'_>) -> String {
    let Some(html) = read_resource(path) else {
        tracing::debug!(path = %path.display(), "Template not found; inlining empty markup");
        return String::new();
    };

    let html = match pipeline.preprocessor {
        Some(pp) => pp.process(&html, SourceKind::Markup),
        None => html,
    };

    for warning in pipeline.validator.validate(&html) {
        tracing::warn!(path = %path.display(), "Error in template: {warning}");
    }

    pipeline.minifier.minify(&html, pipeline.options)
}

// =============================================================================
// Stylesheet
// =============================================================================

static CSS_COMMENTS_AND_BREAKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/\*(?s:.*?)\*/|[\r\n\t]+").expect("stylesheet comment pattern is valid")
});
static CSS_SPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" {2,}").expect("space run pattern is valid"));
static CSS_AROUND_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" ([{:}]) ").expect("punctuation pattern is valid"));
static CSS_AFTER_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([;,]) ").expect("separator pattern is valid"));

/// Load a stylesheet, minifying it when `minify` is set.
pub fn inline_stylesheet(path: &Path, minify: bool) -> String {
    let Some(css) = read_resource(path) else {
        tracing::debug!(path = %path.display(), "Stylesheet not found; inlining empty text");
        return String::new();
    };
    if minify { minify_stylesheet(&css) } else { css }
}

/// Strip comments and line breaks, then squeeze spaces around punctuation.
///
/// Steps run in a fixed order: comments/breaks, space runs, spaces around
/// `{` `:` `}`, after `:`, after `;` `,`, before `!`.
pub fn minify_stylesheet(css: &str) -> String {
    let css = CSS_COMMENTS_AND_BREAKS.replace_all(css, "");
    let css = CSS_SPACE_RUNS.replace_all(&css, " ");
    let css = CSS_AROUND_PUNCT.replace_all(&css, "$1");
    let css = css.replace(": ", ":");
    let css = CSS_AFTER_SEPARATOR.replace_all(&css, "$1");
    css.replace(" !", "!")
}

fn read_resource(path: &Path) -> Option<String> {
    if !path.is_file() {
        return None;
    }
    fs::read_to_string(path).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::minify::{BasicMinifier, NoValidation};
    use std::cell::Cell;
    use tempfile::TempDir;

    #[test]
    fn test_minify_stylesheet() {
        assert_eq!(minify_stylesheet("a { color: red; }\n\n"), "a{color:red;}");
    }

    #[test]
    fn test_minify_stylesheet_comments_and_important() {
        let css = "/* theme */\n.a,  .b {\n\tmargin: 0 auto !important;\n}\n";
        // A brace only loses its leading space when a space also follows it.
        assert_eq!(minify_stylesheet(css), ".a,.b {margin:0 auto!important;}");
    }

    #[test]
    fn test_inline_stylesheet() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.css");
        fs::write(&path, "a { color: red; }\n").unwrap();

        assert_eq!(inline_stylesheet(&path, true), "a{color:red;}");
        assert_eq!(inline_stylesheet(&path, false), "a { color: red; }\n");
        assert_eq!(inline_stylesheet(&dir.path().join("missing.css"), true), "");
    }

    #[test]
    fn test_inline_markup_pipeline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.html");
        fs::write(&path, "<div>\n  <!-- @ifdef DEBUG --><b>dbg</b><!-- @endif -->\n  <span>{{ msg }}</span>\n</div>\n").unwrap();

        let pp = Preprocessor::with_definitions([("MODE", "test")]);
        let calls = Cell::new(0);
        let validator = |_: &str| {
            calls.set(calls.get() + 1);
            vec!["unclosed tag".to_string()]
        };
        let options = HtmlMinifyOptions::default();
        let pipeline = MarkupPipeline {
            preprocessor: Some(&pp),
            validator: &validator,
            minifier: &BasicMinifier,
            options: &options,
        };

        assert_eq!(inline_markup(&path, &pipeline), "<div><span>{{ msg }}</span></div>");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_inline_markup_missing() {
        let options = HtmlMinifyOptions::default();
        let pipeline = MarkupPipeline {
            preprocessor: None,
            validator: &NoValidation,
            minifier: &BasicMinifier,
            options: &options,
        };
        assert_eq!(inline_markup(Path::new("/no/such/c.html"), &pipeline), "");
    }
}
