//! Canonical path handling for the two path spaces (source tree, output tree).
//!
//! ```text
//! "src/App.ts" ──► PathCanonicalizer::canonicalize ──► "/work/src/app.ts"
//!                                                          │
//!                         PathMapper::to_output_path ◄─────┘
//!                                   │
//!                                   ▼
//!                          "/work/dist/app.ts"
//! ```
//!
//! Every cache in the crate is keyed by [`CanonicalPath`]: absolute,
//! `/`-separated, and case-folded when the file system is case-insensitive.

mod canonical;
mod mapper;

pub use canonical::{probe_case_sensitivity, CanonicalPath, PathCanonicalizer};
pub use mapper::{DirectoryRoots, PathMapper};

// =============================================================================
// Lexical Helpers
// =============================================================================

/// Replace every `\` with `/`.
#[inline]
pub fn normalize_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

/// Length of the root prefix of a `/`-separated path (`/`, `C:/`, or none).
fn root_len(path: &str) -> usize {
    let bytes = path.as_bytes();
    if bytes.first() == Some(&b'/') {
        1
    } else if bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/' {
        3
    } else {
        0
    }
}

/// Whether a `/`-separated path is absolute.
#[inline]
pub fn is_absolute(path: &str) -> bool {
    root_len(path) > 0
}

/// Resolve `.` and `..` segments and drop empty segments and trailing slashes.
///
/// Purely lexical: the file system is never consulted. `..` above the root
/// is discarded for absolute paths and kept for relative ones.
pub fn normalize_lexically(path: &str) -> String {
    let path = normalize_slashes(path);
    let root_len = root_len(&path);
    let (root, rest) = path.split_at(root_len);

    let mut segments: Vec<&str> = Vec::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if root_len == 0 {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let mut out = String::with_capacity(path.len());
    out.push_str(root);
    out.push_str(&segments.join("/"));
    if out.is_empty() {
        out.push('.');
    }
    out
}

/// Split off the last segment: `("/a/b", "c")` for `/a/b/c`.
///
/// Returns `None` once only the root (or nothing) is left.
pub(crate) fn split_basename(path: &str) -> Option<(&str, &str)> {
    let root_len = root_len(path);
    if path.len() <= root_len {
        return None;
    }
    match path.rfind('/') {
        Some(idx) if idx >= root_len => Some((&path[..idx], &path[idx + 1..])),
        Some(idx) => Some((&path[..=idx], &path[idx + 1..])),
        None => Some(("", path)),
    }
}

/// Directory part of a `/`-separated path (`.` when there is none).
pub fn dirname(path: &str) -> &str {
    match split_basename(path) {
        Some(("", _)) => ".",
        Some((dir, _)) => dir,
        None => path,
    }
}

/// Join a base directory and a segment path with a single `/`.
pub(crate) fn join(base: &str, rest: &str) -> String {
    if rest.is_empty() {
        base.to_string()
    } else if base.ends_with('/') {
        format!("{base}{rest}")
    } else {
        format!("{base}/{rest}")
    }
}

/// Relative path from directory `from` to `to`, both absolute and normalized.
///
/// Mirrors the usual `relative(from, to)` arithmetic: shared leading
/// segments are dropped, each remaining segment of `from` becomes `..`.
/// Paths on different roots are returned unchanged.
pub fn relative(from: &str, to: &str) -> String {
    let (from_root, from_rest) = from.split_at(root_len(from));
    let (to_root, to_rest) = to.split_at(root_len(to));
    if from_root != to_root {
        return to.to_string();
    }

    let from_segments: Vec<&str> = from_rest.split('/').filter(|s| !s.is_empty()).collect();
    let to_segments: Vec<&str> = to_rest.split('/').filter(|s| !s.is_empty()).collect();
    let common = from_segments
        .iter()
        .zip(&to_segments)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = vec![".."; from_segments.len() - common];
    parts.extend_from_slice(&to_segments[common..]);
    parts.join("/")
}
