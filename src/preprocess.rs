//! Comment-directive preprocessing for sources and component markup.
//!
//! Directives live in comments, so unprocessed files stay valid:
//!
//! ```text
//! // @if NODE_ENV == 'production'        <!-- @ifdef DEBUG -->
//! const api = '/* @echo API_URL */';     <p>debug build</p>
//! // @endif                              <!-- @endif -->
//! ```
//!
//! Supported: `@if`, `@ifdef`, `@ifndef`, `@else`, `@endif`, `@exclude`,
//! `@endexclude`, `@echo`. Blocks nest. Unbalanced directives never fail:
//! an unterminated block runs to the end of the text and a stray closing
//! directive is dropped.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use rustc_hash::FxHashMap;
use serde::Deserialize;

// =============================================================================
// Configuration
// =============================================================================

/// Where preprocessing definitions come from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "PreprocessRepr")]
pub enum Preprocess {
    /// No preprocessing; text is passed through untouched.
    #[default]
    Disabled,
    /// Use the process environment as the definition set.
    Environment,
    /// Use an explicit definition set.
    Definitions(BTreeMap<String, String>),
}

/// Accepts `false`, `true` (environment) or a definitions object.
#[derive(Deserialize)]
#[serde(untagged)]
enum PreprocessRepr {
    Flag(bool),
    Definitions(BTreeMap<String, String>),
}

impl From<PreprocessRepr> for Preprocess {
    fn from(repr: PreprocessRepr) -> Self {
        match repr {
            PreprocessRepr::Flag(false) => Self::Disabled,
            PreprocessRepr::Flag(true) => Self::Environment,
            PreprocessRepr::Definitions(defs) => Self::Definitions(defs),
        }
    }
}

/// Comment syntax the directives are written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// `// @if ...` lines and `/* @echo ... */` blocks.
    Script,
    /// `<!-- @if ... -->` comments.
    Markup,
}

// =============================================================================
// Directive Patterns
// =============================================================================

static SCRIPT_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?m)^[ \t]*//[ \t]*@(?P<ld>ifdef|ifndef|if|else|endif|exclude|endexclude)\b[ \t]*(?P<la>[^\r\n]*?)[ \t]*(?:\r?\n|$)",
        r"|/\*[ \t]*@(?P<bd>ifdef|ifndef|if|else|endif|exclude|endexclude|echo)\b[ \t]*(?P<ba>[^*]*?)[ \t]*\*/",
    ))
    .expect("script directive pattern is valid")
});

static MARKUP_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--[ \t]*@(?P<bd>ifdef|ifndef|if|else|endif|exclude|endexclude|echo)\b[ \t]*(?P<ba>.*?)[ \t]*-->")
        .expect("markup directive pattern is valid")
});

static CONDITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?P<var>[A-Za-z_][A-Za-z0-9_]*)\s*(?P<op>==|!=|=)\s*['"]?(?P<val>.*?)['"]?$"#)
        .expect("condition pattern is valid")
});

// =============================================================================
// Preprocessor
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Conditional,
    Exclude,
}

#[derive(Debug)]
struct Block {
    kind: BlockKind,
    keep: bool,
}

/// Process environment as definitions; variables that are not valid
/// UTF-8 are skipped.
fn environment_definitions() -> FxHashMap<String, String> {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

/// Applies comment directives against a fixed definition set.
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    definitions: FxHashMap<String, String>,
}

impl Preprocessor {
    /// Build a preprocessor, or `None` when preprocessing is disabled.
    pub fn from_config(config: &Preprocess) -> Option<Self> {
        let definitions = match config {
            Preprocess::Disabled => return None,
            Preprocess::Environment => environment_definitions(),
            Preprocess::Definitions(defs) => defs.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        };
        Some(Self { definitions })
    }

    /// Create a preprocessor over explicit definitions.
    pub fn with_definitions<I, K, V>(definitions: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            definitions: definitions.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Apply every directive in `text`.
    pub fn process(&self, text: &str, kind: SourceKind) -> String {
        let pattern = match kind {
            SourceKind::Script => &*SCRIPT_DIRECTIVE,
            SourceKind::Markup => &*MARKUP_DIRECTIVE,
        };

        let mut out = String::with_capacity(text.len());
        let mut stack: Vec<Block> = Vec::new();
        let mut last = 0;

        for caps in pattern.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            let active = stack.iter().all(|b| b.keep);
            if active {
                out.push_str(&text[last..whole.start()]);
            }
            last = whole.end();

            let (directive, argument) = directive_parts(&caps);
            match directive {
                "if" => stack.push(self.conditional(self.evaluate(argument))),
                "ifdef" => stack.push(self.conditional(self.is_defined(argument))),
                "ifndef" => stack.push(self.conditional(!self.is_defined(argument))),
                "else" => {
                    if let Some(block) = stack.last_mut()
                        && block.kind == BlockKind::Conditional
                    {
                        block.keep = !block.keep;
                    }
                }
                "endif" => pop_block(&mut stack, BlockKind::Conditional),
                "exclude" => stack.push(Block {
                    kind: BlockKind::Exclude,
                    keep: false,
                }),
                "endexclude" => pop_block(&mut stack, BlockKind::Exclude),
                "echo" => {
                    if active {
                        out.push_str(self.value(argument));
                    }
                }
                _ => {}
            }
        }

        if stack.iter().all(|b| b.keep) {
            out.push_str(&text[last..]);
        }
        out
    }

    fn conditional(&self, keep: bool) -> Block {
        Block {
            kind: BlockKind::Conditional,
            keep,
        }
    }

    fn is_defined(&self, name: &str) -> bool {
        self.definitions.contains_key(name.trim())
    }

    fn value(&self, name: &str) -> &str {
        self.definitions.get(name.trim()).map_or("", String::as_str)
    }

    /// `VAR == 'x'`, `VAR != 'x'`, `VAR='x'`, `VAR` or `!VAR`.
    fn evaluate(&self, expr: &str) -> bool {
        let expr = expr.trim();
        if let Some(caps) = CONDITION.captures(expr) {
            let actual = self.definitions.get(&caps["var"]).map(String::as_str);
            let expected = &caps["val"];
            return match &caps["op"] {
                "!=" => actual != Some(expected),
                _ => actual == Some(expected),
            };
        }
        match expr.strip_prefix('!') {
            Some(name) => !self.is_truthy(name),
            None => self.is_truthy(expr),
        }
    }

    fn is_truthy(&self, name: &str) -> bool {
        self.definitions
            .get(name.trim())
            .is_some_and(|v| !v.is_empty() && v != "false" && v != "0")
    }
}

fn directive_parts<'t>(caps: &Captures<'t>) -> (&'t str, &'t str) {
    let directive = caps.name("ld").or_else(|| caps.name("bd"));
    let argument = caps.name("la").or_else(|| caps.name("ba"));
    (
        directive.map_or("", |m| m.as_str()),
        argument.map_or("", |m| m.as_str()),
    )
}

fn pop_block(stack: &mut Vec<Block>, kind: BlockKind) {
    if stack.last().is_some_and(|b| b.kind == kind) {
        stack.pop();
    }
}
