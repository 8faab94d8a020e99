//! Output artifact store keyed by canonical output path.

use rustc_hash::FxHashMap;

use crate::path::{CanonicalPath, PathMapper};

/// Emitted text of the current pass, keyed by canonical output path.
///
/// Cleared wholesale on every reset; within a pass the last write wins.
#[derive(Debug, Default)]
pub struct OutputStore {
    entries: FxHashMap<CanonicalPath, String>,
}

impl OutputStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `text` under the canonical form of `output_path`.
    ///
    /// When the matching source file is reached through a symlink, the
    /// text is also stored under the output path derived from the real
    /// source path, so both names read back identical text. Returns the
    /// canonical key of the primary write.
    pub fn write(&mut self, mapper: &PathMapper, output_path: &str, text: &str) -> CanonicalPath {
        let output = mapper.canonicalize(output_path);
        tracing::debug!(path = %output, "Cache write");
        self.entries.insert(output.clone(), text.to_string());

        let source = mapper.to_source_path(&output);
        let followed = mapper.canonicalizer().resolve_symlinks(&source);
        if followed != source {
            let aliased = mapper.to_output_path(&followed);
            tracing::debug!(path = %aliased, "Cache write (followed)");
            self.entries.insert(aliased, text.to_string());
        }
        output
    }

    /// Text stored under `output_path`, if any.
    ///
    /// A miss is normal: declaration-only inputs emit nothing.
    pub fn read(&self, mapper: &PathMapper, output_path: &str) -> Option<&str> {
        self.get(&mapper.canonicalize(output_path))
    }

    /// Text stored under an already canonical key.
    pub fn get(&self, output: &CanonicalPath) -> Option<&str> {
        self.entries.get(output).map(String::as_str)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored artifacts, aliases included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been written since the last clear.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical keys currently stored, sorted.
    pub fn paths(&self) -> Vec<CanonicalPath> {
        let mut paths: Vec<_> = self.entries.keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathCanonicalizer;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn mapper(root: &Path) -> PathMapper {
        PathMapper::new(PathCanonicalizer::new(root, true), "src", "dist")
    }

    #[test]
    fn test_write_read_last_wins() {
        let mapper = mapper(Path::new("/work"));
        let mut store = OutputStore::new();
        store.write(&mapper, "dist/a.js", "one");
        store.write(&mapper, "/work/dist/./a.js", "two");

        assert_eq!(store.read(&mapper, "dist/a.js"), Some("two"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.read(&mapper, "dist/missing.js"), None);

        store.clear();
        assert!(store.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_source_duplicates_write() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("src/real")).unwrap();
        fs::write(root.join("src/real/c.ts"), "").unwrap();
        std::os::unix::fs::symlink(root.join("src/real"), root.join("src/link")).unwrap();

        let mapper = mapper(&root);
        let mut store = OutputStore::new();
        store.write(&mapper, "dist/link/c.js", "emitted");

        assert_eq!(store.read(&mapper, "dist/link/c.js"), Some("emitted"));
        assert_eq!(store.read(&mapper, "dist/real/c.js"), Some("emitted"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_plain_source_single_write() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("src")).unwrap();

        let mapper = mapper(&root);
        let mut store = OutputStore::new();
        store.write(&mapper, "dist/c.js", "emitted");
        assert_eq!(store.paths(), vec![mapper.canonicalize("dist/c.js")]);
    }
}
