//! Path canonicalization and symlink resolution.

use std::borrow::Borrow;
use std::fmt;
use std::fs;
use std::path::Path;

use super::{is_absolute, join, normalize_lexically, normalize_slashes, split_basename};

// =============================================================================
// CanonicalPath
// =============================================================================

/// Absolute, `/`-separated, case-folded-if-insensitive path key.
///
/// Only [`PathCanonicalizer`] constructs these, so two equal keys always
/// name the same file under the host's case-sensitivity rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalPath(String);

impl CanonicalPath {
    /// View as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unwrap into the owned string.
    #[inline]
    pub fn into_string(self) -> String {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn from_test(path: &str) -> Self {
        Self(path.to_string())
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CanonicalPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<CanonicalPath> for String {
    fn from(path: CanonicalPath) -> Self {
        path.0
    }
}

// =============================================================================
// Case Sensitivity Probe
// =============================================================================

/// Best-effort check whether the file system holding `dir` is case-sensitive.
///
/// Looks up `dir` with the case of every letter swapped; if that still
/// resolves, the file system folds case. Paths without letters and probe
/// failures report case-sensitive.
pub fn probe_case_sensitivity(dir: &Path) -> bool {
    let original = dir.to_string_lossy();
    let swapped: String = original
        .chars()
        .map(|c| {
            if c.is_lowercase() {
                c.to_uppercase().next().unwrap_or(c)
            } else {
                c.to_lowercase().next().unwrap_or(c)
            }
        })
        .collect();

    if swapped == original {
        return true;
    }
    fs::metadata(&swapped).is_err()
}

// =============================================================================
// PathCanonicalizer
// =============================================================================

/// Produces [`CanonicalPath`] keys relative to a fixed working directory.
///
/// Case sensitivity is decided once at construction and never re-probed.
#[derive(Debug, Clone)]
pub struct PathCanonicalizer {
    current_dir: String,
    case_sensitive: bool,
}

impl PathCanonicalizer {
    /// Create a canonicalizer anchored at `current_dir`.
    ///
    /// `case_sensitive` is usually the result of [`probe_case_sensitivity`].
    pub fn new(current_dir: &Path, case_sensitive: bool) -> Self {
        let mut canonicalizer = Self {
            current_dir: String::new(),
            case_sensitive,
        };
        let dir = normalize_slashes(&current_dir.to_string_lossy());
        let dir = if is_absolute(&dir) {
            dir
        } else {
            let cwd = std::env::current_dir()
                .map(|cwd| normalize_slashes(&cwd.to_string_lossy()))
                .unwrap_or_else(|_| "/".to_string());
            join(&cwd, &dir)
        };
        canonicalizer.current_dir = canonicalizer.fold(normalize_lexically(&dir));
        canonicalizer
    }

    /// Whether file names are compared case-sensitively.
    #[inline]
    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// The canonical working directory every relative path resolves against.
    #[inline]
    pub fn current_dir(&self) -> &str {
        &self.current_dir
    }

    /// Normalize separators and fold case, without resolving against the
    /// working directory. This is the engine's canonical-name getter.
    pub fn canonical_file_name(&self, name: &str) -> String {
        self.fold(normalize_slashes(name))
    }

    /// Resolve `path` against the working directory, normalize it, and fold
    /// case if the file system is case-insensitive.
    pub fn canonicalize(&self, path: impl AsRef<str>) -> CanonicalPath {
        let path = normalize_slashes(path.as_ref());
        let absolute = if is_absolute(&path) {
            path
        } else {
            join(&self.current_dir, &path)
        };
        CanonicalPath(self.fold(normalize_lexically(&absolute)))
    }

    /// Canonicalize `path` and then replace every symlinked prefix with its
    /// real target.
    ///
    /// Walks from the full path towards the root: a prefix that is a symlink
    /// is swapped for its real path, anything else has its trailing segment
    /// peeled off and remembered. The walk ends when nothing is left to peel.
    /// Prefixes that do not exist are treated as plain directories.
    pub fn resolve_symlinks(&self, path: impl AsRef<str>) -> CanonicalPath {
        let mut current = self.canonicalize(path).into_string();
        let mut peeled: Vec<String> = Vec::new();

        loop {
            if is_symlink(&current)
                && let Ok(real) = fs::canonicalize(&current)
            {
                current = strip_verbatim(normalize_slashes(&real.to_string_lossy()));
                continue;
            }
            let Some((parent, name)) = split_basename(&current) else {
                break;
            };
            peeled.push(name.to_string());
            current = parent.to_string();
        }

        peeled.reverse();
        self.canonicalize(join(&current, &peeled.join("/")))
    }

    fn fold(&self, path: String) -> String {
        if self.case_sensitive {
            path
        } else {
            path.to_lowercase()
        }
    }
}

fn is_symlink(path: &str) -> bool {
    fs::symlink_metadata(path).is_ok_and(|meta| meta.file_type().is_symlink())
}

/// Drop the `//?/` prefix Windows adds to real paths.
fn strip_verbatim(path: String) -> String {
    match path.strip_prefix("//?/") {
        Some(rest) => rest.to_string(),
        None => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_canonicalize_relative() {
        let canon = PathCanonicalizer::new(Path::new("/work"), true);
        assert_eq!(canon.canonicalize("src/../lib/a.ts").as_str(), "/work/lib/a.ts");
        assert_eq!(canon.canonicalize("/abs/B.ts").as_str(), "/abs/B.ts");
    }

    #[test]
    fn test_case_folding() {
        let insensitive = PathCanonicalizer::new(Path::new("/Work"), false);
        assert_eq!(insensitive.canonicalize("A/B.ts"), insensitive.canonicalize("a/b.ts"));
        assert_eq!(insensitive.current_dir(), "/work");

        let sensitive = PathCanonicalizer::new(Path::new("/Work"), true);
        assert_ne!(sensitive.canonicalize("A/B.ts"), sensitive.canonicalize("a/b.ts"));
    }

    #[test]
    fn test_canonical_file_name() {
        let canon = PathCanonicalizer::new(Path::new("/work"), false);
        assert_eq!(canon.canonical_file_name("Src\\App.TS"), "src/app.ts");
    }

    #[test]
    fn test_resolve_symlinks_plain_path() {
        let dir = TempDir::new().unwrap();
        let real = dir.path().canonicalize().unwrap();
        fs::create_dir_all(real.join("src")).unwrap();
        fs::write(real.join("src/a.ts"), "").unwrap();

        let canon = PathCanonicalizer::new(&real, true);
        let path = canon.canonicalize("src/a.ts");
        assert_eq!(canon.resolve_symlinks(path.as_str()), path);
    }

    #[test]
    fn test_resolve_symlinks_missing_path() {
        let canon = PathCanonicalizer::new(Path::new("/definitely/not/here"), true);
        assert_eq!(
            canon.resolve_symlinks("x/y.ts").as_str(),
            "/definitely/not/here/x/y.ts"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_symlinks_through_link() {
        let dir = TempDir::new().unwrap();
        let real = dir.path().canonicalize().unwrap();
        fs::create_dir_all(real.join("shared")).unwrap();
        fs::write(real.join("shared/c.ts"), "").unwrap();
        fs::create_dir_all(real.join("src")).unwrap();
        std::os::unix::fs::symlink(real.join("shared"), real.join("src/linked")).unwrap();

        let canon = PathCanonicalizer::new(&real, true);
        let resolved = canon.resolve_symlinks("src/linked/c.ts");
        assert_eq!(resolved, canon.canonicalize("shared/c.ts"));
    }
}
