//! Resource-URL reference rewriting in emitted text.
//!
//! `templateUrl: './card.html'` becomes `template: require('./card.html')`
//! when the file exists next to the source, or `template: ''` when it does
//! not. Only the matched property is touched; the rest of the text is
//! copied through byte for byte.

use std::borrow::Cow;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Which resource-URL property to rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// `templateUrl`, value must end in `.html`.
    Template,
    /// `styleUrl`, any file name.
    Style,
}

impl ResourceKind {
    /// Property name written in place of the URL property.
    pub fn property(self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Style => "style",
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            Self::Template => &TEMPLATE_URL,
            Self::Style => &STYLE_URL,
        }
    }
}

/// Relative (`./a/b.x`, `../b.x`) or bare (`b.x`) path, as group 1.
macro_rules! url_pattern {
    ($property:literal, $suffix:literal) => {
        concat!(
            $property,
            r#"Url\s*:\s*["']((?:\.{1,2}(?:/[\w.\-]+)*/[\w\-.]+|[\w\-.]+)"#,
            $suffix,
            r#")["']"#
        )
    };
}

static TEMPLATE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(url_pattern!("template", r"\.html")).expect("template url pattern is valid")
});

static STYLE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(url_pattern!("style", "")).expect("style url pattern is valid"));

/// Rewrite every `<kind>Url` property in `text`, resolving values against
/// `source_dir`.
pub fn rewrite_references<'t>(text: &'t str, source_dir: &Path, kind: ResourceKind) -> Cow<'t, str> {
    kind.pattern().replace_all(text, |caps: &Captures<'_>| {
        let value = &caps[1];
        let relative = if value.starts_with('.') {
            value.to_string()
        } else {
            format!("./{value}")
        };

        if source_dir.join(&relative).is_file() {
            format!("{}: require('{relative}')", kind.property())
        } else {
            tracing::debug!(dir = %source_dir.display(), file = %relative, "Referenced resource missing");
            format!("{}: ''", kind.property())
        }
    })
}

/// Rewrite template references, then style references.
pub fn rewrite_all(text: &str, source_dir: &Path) -> String {
    let text = rewrite_references(text, source_dir, ResourceKind::Template);
    rewrite_references(&text, source_dir, ResourceKind::Style).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("x.html"), "<p></p>").unwrap();
        fs::write(dir.path().join("x.css"), "p{}").unwrap();
        fs::create_dir_all(dir.path().join("views")).unwrap();
        fs::write(dir.path().join("views/list.html"), "<ul></ul>").unwrap();
        dir
    }

    #[test]
    fn test_existing_template() {
        let dir = fixture();
        let out = rewrite_references(r#"@Component({ templateUrl: "./x.html" })"#, dir.path(), ResourceKind::Template);
        assert_eq!(out, "@Component({ template: require('./x.html') })");
    }

    #[test]
    fn test_missing_template() {
        let dir = fixture();
        let out = rewrite_references("{ templateUrl: './y.html' }", dir.path(), ResourceKind::Template);
        assert_eq!(out, "{ template: '' }");
    }

    #[test]
    fn test_bare_and_nested_paths() {
        let dir = fixture();
        let bare = rewrite_references("templateUrl:'x.html'", dir.path(), ResourceKind::Template);
        assert_eq!(bare, "template: require('./x.html')");
        let nested = rewrite_references("templateUrl : \"./views/list.html\"", dir.path(), ResourceKind::Template);
        assert_eq!(nested, "template: require('./views/list.html')");
    }

    #[test]
    fn test_template_requires_html_suffix() {
        let dir = fixture();
        let text = "templateUrl: './x.css', other: 1";
        assert_eq!(rewrite_references(text, dir.path(), ResourceKind::Template), text);
    }

    #[test]
    fn test_style_any_suffix() {
        let dir = fixture();
        let out = rewrite_references("styleUrl: './x.css'", dir.path(), ResourceKind::Style);
        assert_eq!(out, "style: require('./x.css')");
    }

    #[test]
    fn test_unrelated_text_untouched() {
        let dir = fixture();
        let text = "var templateUrl = './x.html';\n// templateUrl: nothing\n";
        let out = rewrite_references(text, dir.path(), ResourceKind::Template);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(out, text);
    }

    #[test]
    fn test_rewrite_all() {
        let dir = fixture();
        let text = "exports.C = { templateUrl: './x.html', styleUrl: './x.css' };\n//# sourceMappingURL=c.js.map";
        assert_eq!(
            rewrite_all(text, dir.path()),
            "exports.C = { template: require('./x.html'), style: require('./x.css') };\n//# sourceMappingURL=c.js.map"
        );
    }
}
