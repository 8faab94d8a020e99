//! Markup minification and validation seams.
//!
//! The real minifier and template validator are external collaborators;
//! the host only fixes the option set it hands them. [`BasicMinifier`]
//! covers the fixed options well enough for component templates and is
//! the default when no external minifier is plugged in.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::diagnostic::HostError;

// =============================================================================
// Options
// =============================================================================

/// Options handed to the markup minifier.
///
/// Keys are camelCase so overrides can be given as a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HtmlMinifyOptions {
    /// Drop `<!-- -->` comments.
    pub remove_comments: bool,
    /// Replace any doctype with `<!DOCTYPE html>`.
    pub use_short_doctype: bool,
    /// Drop closing tags the HTML parser infers anyway.
    pub remove_optional_tags: bool,
    /// Collapse whitespace runs and drop whitespace between tags.
    pub collapse_whitespace: bool,
    /// Drop `class=""`, `id=""`, `style=""` and similar.
    pub remove_empty_attributes: bool,
    /// Strip quotes around attribute values that do not need them.
    pub remove_attribute_quotes: bool,
    /// `disabled="disabled"` becomes `disabled`.
    pub collapse_boolean_attributes: bool,
    /// Characters that may prefix an attribute name (template bindings).
    pub custom_attr_surround: Vec<String>,
}

impl Default for HtmlMinifyOptions {
    fn default() -> Self {
        Self {
            remove_comments: true,
            use_short_doctype: true,
            remove_optional_tags: true,
            collapse_whitespace: true,
            remove_empty_attributes: true,
            remove_attribute_quotes: true,
            collapse_boolean_attributes: true,
            custom_attr_surround: vec!["@".to_string(), ":".to_string()],
        }
    }
}

impl HtmlMinifyOptions {
    /// Merge a JSON object of overrides over the defaults, key by key.
    ///
    /// Unknown keys are ignored; a known key with a wrongly typed value is
    /// an error.
    pub fn with_overrides(overrides: &Map<String, Value>) -> Result<Self, HostError> {
        let mut merged = serde_json::to_value(Self::default())?;
        if let Value::Object(fields) = &mut merged {
            for (key, value) in overrides {
                if fields.contains_key(key) {
                    fields.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(serde_json::from_value(merged)?)
    }
}

// =============================================================================
// Seams
// =============================================================================

/// Minifies component markup.
pub trait MarkupMinifier {
    /// Return the minified form of `html`.
    fn minify(&self, html: &str, options: &HtmlMinifyOptions) -> String;
}

/// Structural checks on component markup; returns warning messages.
pub trait MarkupValidator {
    /// Validate `html` and return one message per problem found.
    fn validate(&self, html: &str) -> Vec<String>;
}

/// Validator that accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoValidation;

impl MarkupValidator for NoValidation {
    fn validate(&self, _html: &str) -> Vec<String> {
        Vec::new()
    }
}

impl<F> MarkupValidator for F
where
    F: Fn(&str) -> Vec<String>,
{
    fn validate(&self, html: &str) -> Vec<String> {
        self(html)
    }
}

// =============================================================================
// BasicMinifier
// =============================================================================

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern is valid"));
static DOCTYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<!doctype[^>]*>").expect("doctype pattern is valid"));
static OPTIONAL_CLOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</(?:li|option|tr|td|th|dt|dd)>").expect("optional tag pattern is valid")
});
static BETWEEN_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s+<").expect("whitespace pattern is valid"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}|[\t\r\n]").expect("whitespace pattern is valid"));
static EMPTY_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\s(?:class|id|style|title|lang|dir|on[a-z]+)=(?:""|'')"#)
        .expect("empty attribute pattern is valid")
});
static BOOLEAN_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(\s)(checked|disabled|selected|readonly|required|multiple|hidden|autofocus|autoplay|controls|loop|muted|novalidate|open)=(?:"[^"]*"|'[^']*')"#,
    )
    .expect("boolean attribute pattern is valid")
});

/// Elements rendered inline; whitespace between two of them is visible.
const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "big", "button", "cite", "code", "del", "dfn", "em", "font",
    "i", "img", "input", "ins", "kbd", "label", "mark", "q", "s", "samp", "select", "small",
    "span", "strike", "strong", "sub", "sup", "textarea", "time", "tt", "u", "var",
];

/// Name of the tag whose text starts right after its `<`.
fn tag_name(tag: &str) -> &str {
    let tag = tag.strip_prefix('/').unwrap_or(tag);
    let end = tag
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(tag.len());
    &tag[..end]
}

fn is_inline(name: &str) -> bool {
    INLINE_TAGS.iter().any(|inline| inline.eq_ignore_ascii_case(name))
}

/// Drop whitespace between tags unless both neighbours are inline, in
/// which case a single space is kept.
fn collapse_between_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for gap in BETWEEN_TAGS.find_iter(html) {
        let before = &html[..gap.start()];
        let prev = before.rfind('<').map_or("", |at| tag_name(&before[at + 1..]));
        let next = tag_name(&html[gap.end()..]);
        out.push_str(&html[last..gap.start()]);
        out.push_str(if is_inline(prev) && is_inline(next) { "> <" } else { "><" });
        last = gap.end();
    }
    out.push_str(&html[last..]);
    out
}

/// Small regex-driven minifier honoring [`HtmlMinifyOptions`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicMinifier;

impl BasicMinifier {
    /// Attribute pattern whose names may start with the binding prefixes.
    fn quoted_attribute(options: &HtmlMinifyOptions) -> Option<Regex> {
        let prefixes: String = options
            .custom_attr_surround
            .iter()
            .map(|p| regex::escape(p))
            .collect();
        let pattern = format!(r#"(\s[{prefixes}A-Za-z_][{prefixes}\w.\-]*)=(?:"([^"\s'=<>`]+)"|'([^"\s'=<>`]+)')"#);
        Regex::new(&pattern).ok()
    }
}

impl MarkupMinifier for BasicMinifier {
    fn minify(&self, html: &str, options: &HtmlMinifyOptions) -> String {
        let mut out = html.to_string();
        if options.remove_comments {
            out = COMMENT.replace_all(&out, "").into_owned();
        }
        if options.use_short_doctype {
            out = DOCTYPE.replace_all(&out, "<!DOCTYPE html>").into_owned();
        }
        if options.remove_optional_tags {
            out = OPTIONAL_CLOSE.replace_all(&out, "").into_owned();
        }
        if options.collapse_whitespace {
            out = collapse_between_tags(&out);
            out = WHITESPACE.replace_all(&out, " ").into_owned();
            out = out.trim().to_string();
        }
        if options.remove_empty_attributes {
            out = EMPTY_ATTR.replace_all(&out, "").into_owned();
        }
        if options.collapse_boolean_attributes {
            out = BOOLEAN_ATTR.replace_all(&out, "$1$2").into_owned();
        }
        if options.remove_attribute_quotes
            && let Some(attr) = Self::quoted_attribute(options)
        {
            out = attr
                .replace_all(&out, |caps: &regex::Captures<'_>| {
                    let value = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
                    format!("{}={}", &caps[1], value)
                })
                .into_owned();
        }
        out
    }
}

impl<F> MarkupMinifier for F
where
    F: Fn(&str, &HtmlMinifyOptions) -> String,
{
    fn minify(&self, html: &str, options: &HtmlMinifyOptions) -> String {
        self(html, options)
    }
}
