//! Bidirectional mapping between the source tree and the output tree.

use super::canonical::{CanonicalPath, PathCanonicalizer};
use super::{join, relative};

/// The three fixed directories of a host, all canonical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRoots {
    /// Root of the source tree (`rootDir`).
    pub source_root: CanonicalPath,
    /// Root of the output tree (`outDir`).
    pub output_root: CanonicalPath,
    /// Working directory relative names resolve against.
    pub current_dir: CanonicalPath,
}

/// Converts canonical paths between the source and output trees.
///
/// Paths outside the configured roots are not special-cased: the relative
/// arithmetic is applied literally and may leave the target root.
#[derive(Debug, Clone)]
pub struct PathMapper {
    canonicalizer: PathCanonicalizer,
    roots: DirectoryRoots,
}

impl PathMapper {
    /// Create a mapper; `source_root` and `output_root` resolve against the
    /// canonicalizer's working directory.
    pub fn new(canonicalizer: PathCanonicalizer, source_root: &str, output_root: &str) -> Self {
        let roots = DirectoryRoots {
            source_root: canonicalizer.canonicalize(source_root),
            output_root: canonicalizer.canonicalize(output_root),
            current_dir: canonicalizer.canonicalize(canonicalizer.current_dir()),
        };
        Self {
            canonicalizer,
            roots,
        }
    }

    /// The canonicalizer shared by both path spaces.
    #[inline]
    pub fn canonicalizer(&self) -> &PathCanonicalizer {
        &self.canonicalizer
    }

    /// The configured directory roots.
    #[inline]
    pub fn roots(&self) -> &DirectoryRoots {
        &self.roots
    }

    /// Shorthand for [`PathCanonicalizer::canonicalize`].
    #[inline]
    pub fn canonicalize(&self, path: impl AsRef<str>) -> CanonicalPath {
        self.canonicalizer.canonicalize(path)
    }

    /// Re-anchor a source path under the output root.
    pub fn to_output_path(&self, source_path: impl AsRef<str>) -> CanonicalPath {
        self.reanchor(source_path.as_ref(), &self.roots.source_root, &self.roots.output_root)
    }

    /// Re-anchor an output path under the source root.
    pub fn to_source_path(&self, output_path: impl AsRef<str>) -> CanonicalPath {
        self.reanchor(output_path.as_ref(), &self.roots.output_root, &self.roots.source_root)
    }

    fn reanchor(&self, path: &str, from: &CanonicalPath, to: &CanonicalPath) -> CanonicalPath {
        let path = self.canonicalizer.canonicalize(path);
        let rel = relative(from.as_str(), path.as_str());
        self.canonicalizer.canonicalize(join(to.as_str(), &rel))
    }
}
