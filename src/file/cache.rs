//! Generation-based parsed-file cache.
//!
//! # Caching Strategy
//!
//! ```text
//! FileVersionCache
//! ├── current:  FxHashMap<CanonicalPath, FileRecord>  ← this pass
//! └── previous: FxHashMap<CanonicalPath, FileRecord>  ← last pass
//!
//! add_or_reuse(path, contents)
//!   1. current record with identical contents   → reuse
//!   2. previous record with identical contents  → reuse, copy into current
//!   3. otherwise                                → parse, stamp generation
//! ```
//!
//! `reset()` rotates current into previous, so a record survives exactly
//! one pass in which it is not requested.

use std::mem;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::path::CanonicalPath;

/// Monotonic compile-pass counter.
pub type Generation = u64;

/// Listener called once per `add_or_reuse` with the canonical path and the
/// relative name the engine will report.
pub type FileObserver = Box<dyn FnMut(&CanonicalPath, &str)>;

// =============================================================================
// FileRecord
// =============================================================================

/// One parsed source file.
#[derive(Debug)]
pub struct FileRecord<P> {
    relative_name: String,
    contents: String,
    parsed: Rc<P>,
    version: Generation,
    root: bool,
    dependency_module: bool,
}

impl<P> Clone for FileRecord<P> {
    fn clone(&self) -> Self {
        Self {
            relative_name: self.relative_name.clone(),
            contents: self.contents.clone(),
            parsed: Rc::clone(&self.parsed),
            version: self.version,
            root: self.root,
            dependency_module: self.dependency_module,
        }
    }
}

impl<P> FileRecord<P> {
    /// Name relative to the working directory, as diagnostics show it.
    pub fn relative_name(&self) -> &str {
        &self.relative_name
    }

    /// Raw file contents, before preprocessing.
    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// The engine's parsed representation.
    pub fn parsed(&self) -> &Rc<P> {
        &self.parsed
    }

    /// Generation the parsed representation was created in.
    pub fn version(&self) -> Generation {
        self.version
    }

    /// Whether the file was requested as a program root.
    pub fn is_root(&self) -> bool {
        self.root
    }

    /// Whether the file lives in an installed dependency package.
    pub fn is_dependency_module(&self) -> bool {
        self.dependency_module
    }
}

/// Whether `path` is inside an installed package other than the compiler's
/// own bundled library.
pub fn is_dependency_module(path: &str) -> bool {
    const SEGMENT: &str = "/node_modules/";
    path.match_indices(SEGMENT)
        .any(|(at, _)| !path[at + SEGMENT.len()..].starts_with("typescript/"))
}

// =============================================================================
// FileVersionCache
// =============================================================================

/// Holds the current and previous generation of parsed files.
pub struct FileVersionCache<P> {
    current: FxHashMap<CanonicalPath, FileRecord<P>>,
    previous: FxHashMap<CanonicalPath, FileRecord<P>>,
    generation: Generation,
    observers: Vec<FileObserver>,
}

impl<P> Default for FileVersionCache<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> FileVersionCache<P> {
    /// Create an empty cache at generation 0.
    pub fn new() -> Self {
        Self {
            current: FxHashMap::default(),
            previous: FxHashMap::default(),
            generation: 0,
            observers: Vec::new(),
        }
    }

    /// The current generation number.
    #[inline]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Register a file-observed listener.
    pub fn subscribe(&mut self, observer: FileObserver) {
        self.observers.push(observer);
    }

    /// Start a new generation: current becomes previous, the old previous
    /// generation is dropped.
    pub fn reset(&mut self) {
        self.previous = mem::take(&mut self.current);
        self.generation += 1;
    }

    /// Return the parsed representation for `path`, reusing a cached one
    /// when the raw contents are unchanged.
    ///
    /// `parse` receives the relative name and the raw contents and is only
    /// called on a miss.
    pub fn add_or_reuse(
        &mut self,
        path: CanonicalPath,
        relative_name: String,
        contents: String,
        root: bool,
        parse: impl FnOnce(&str, &str) -> P,
    ) -> Rc<P> {
        let reused = self
            .current
            .get(&path)
            .filter(|record| record.contents == contents)
            .map(|record| (Rc::clone(&record.parsed), record.version, "current"))
            .or_else(|| {
                self.previous
                    .get(&path)
                    .filter(|record| record.contents == contents)
                    .map(|record| (Rc::clone(&record.parsed), record.version, "previous"))
            });

        let (parsed, version) = match reused {
            Some((parsed, version, from)) => {
                tracing::trace!(path = %path, version, "Reused {from} file");
                (parsed, version)
            }
            None => {
                let parsed = Rc::new(parse(&relative_name, &contents));
                tracing::trace!(path = %path, version = self.generation, "New version of source file");
                (parsed, self.generation)
            }
        };

        let record = FileRecord {
            dependency_module: is_dependency_module(path.as_str()),
            relative_name,
            contents,
            parsed: Rc::clone(&parsed),
            version,
            root,
        };

        for observer in &mut self.observers {
            observer(&path, &record.relative_name);
        }
        self.current.insert(path, record);
        parsed
    }

    /// Current-generation record for `path`.
    pub fn get(&self, path: &str) -> Option<&FileRecord<P>> {
        self.current.get(path)
    }

    /// Previous-generation record for `path`.
    pub fn get_previous(&self, path: &str) -> Option<&FileRecord<P>> {
        self.previous.get(path)
    }

    /// Canonical paths of the current generation's root files, sorted.
    pub fn root_paths(&self) -> Vec<CanonicalPath> {
        self.collect_paths(|record| record.root)
    }

    /// Canonical paths of the current generation's dependency-module files,
    /// sorted.
    pub fn dependency_module_paths(&self) -> Vec<CanonicalPath> {
        self.collect_paths(|record| record.dependency_module)
    }

    /// Every canonical path observed in the current generation, sorted.
    pub fn observed_paths(&self) -> Vec<CanonicalPath> {
        self.collect_paths(|_| true)
    }

    /// Number of records in the current generation.
    pub fn len(&self) -> usize {
        self.current.len()
    }

    /// Whether the current generation is empty.
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    fn collect_paths(&self, keep: impl Fn(&FileRecord<P>) -> bool) -> Vec<CanonicalPath> {
        let mut paths: Vec<CanonicalPath> = self
            .current
            .iter()
            .filter(|(_, record)| keep(record))
            .map(|(path, _)| path.clone())
            .collect();
        paths.sort();
        paths
    }
}

impl<P> std::fmt::Debug for FileVersionCache<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileVersionCache")
            .field("generation", &self.generation)
            .field("current", &self.current.len())
            .field("previous", &self.previous.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathCanonicalizer;
    use rstest::rstest;
    use std::cell::{Cell, RefCell};
    use std::path::Path;

    fn path(p: &str) -> CanonicalPath {
        PathCanonicalizer::new(Path::new("/work"), true).canonicalize(p)
    }

    fn add(cache: &mut FileVersionCache<String>, p: &str, text: &str, parses: &Cell<usize>) -> Rc<String> {
        cache.add_or_reuse(path(p), p.to_string(), text.to_string(), true, |name, contents| {
            parses.set(parses.get() + 1);
            format!("{name}:{contents}")
        })
    }

    #[test]
    fn test_reuse_within_generation() {
        let mut cache = FileVersionCache::new();
        let parses = Cell::new(0);
        cache.reset();
        let a = add(&mut cache, "main.ts", "let x = 1;", &parses);
        let b = add(&mut cache, "main.ts", "let x = 1;", &parses);
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(parses.get(), 1);
    }

    #[test]
    fn test_reuse_across_reset_returns_same_handle() {
        let mut cache = FileVersionCache::new();
        let parses = Cell::new(0);
        cache.reset();
        let first = add(&mut cache, "main.ts", "let x = 1;", &parses);
        cache.reset();
        let second = add(&mut cache, "main.ts", "let x = 1;", &parses);

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(parses.get(), 1);
        assert_eq!(cache.get("/work/main.ts").map(FileRecord::version), Some(1));
    }

    #[test]
    fn test_changed_contents_reparse() {
        let mut cache = FileVersionCache::new();
        let parses = Cell::new(0);
        cache.reset();
        add(&mut cache, "main.ts", "let x = 1;", &parses);
        cache.reset();
        let changed = add(&mut cache, "main.ts", "let x = 2;", &parses);

        assert_eq!(parses.get(), 2);
        assert_eq!(*changed, "main.ts:let x = 2;");
        assert_eq!(cache.get("/work/main.ts").map(FileRecord::version), Some(2));
    }

    #[test]
    fn test_two_resets_evict() {
        let mut cache = FileVersionCache::new();
        let parses = Cell::new(0);
        cache.reset();
        add(&mut cache, "old.ts", "x", &parses);
        cache.reset();
        assert!(cache.get("/work/old.ts").is_none());
        assert!(cache.get_previous("/work/old.ts").is_some());
        cache.reset();
        assert!(cache.get_previous("/work/old.ts").is_none());

        add(&mut cache, "old.ts", "x", &parses);
        assert_eq!(parses.get(), 2);
    }

    #[test]
    fn test_root_and_dependency_queries() {
        let mut cache: FileVersionCache<()> = FileVersionCache::new();
        cache.reset();
        cache.add_or_reuse(path("src/main.ts"), "src/main.ts".into(), "".into(), true, |_, _| ());
        cache.add_or_reuse(
            path("node_modules/lib/index.d.ts"),
            "node_modules/lib/index.d.ts".into(),
            "".into(),
            false,
            |_, _| (),
        );
        cache.add_or_reuse(
            path("node_modules/typescript/lib/lib.d.ts"),
            "node_modules/typescript/lib/lib.d.ts".into(),
            "".into(),
            false,
            |_, _| (),
        );

        assert_eq!(cache.root_paths(), vec![path("src/main.ts")]);
        assert_eq!(cache.dependency_module_paths(), vec![path("node_modules/lib/index.d.ts")]);
        assert_eq!(cache.observed_paths().len(), 3);
    }

    #[test]
    fn test_observer_called_once_per_call() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut cache: FileVersionCache<()> = FileVersionCache::new();
        let sink = Rc::clone(&seen);
        cache.subscribe(Box::new(move |path, name| {
            sink.borrow_mut().push((path.to_string(), name.to_string()));
        }));

        cache.reset();
        cache.add_or_reuse(path("a.ts"), "a.ts".into(), "1".into(), false, |_, _| ());
        cache.add_or_reuse(path("a.ts"), "a.ts".into(), "1".into(), false, |_, _| ());

        assert_eq!(
            *seen.borrow(),
            vec![
                ("/work/a.ts".to_string(), "a.ts".to_string()),
                ("/work/a.ts".to_string(), "a.ts".to_string()),
            ]
        );
    }

    #[rstest]
    #[case("/work/node_modules/vue/types/index.d.ts", true)]
    #[case("/work/node_modules/typescript/lib/lib.d.ts", false)]
    #[case("/work/node_modules/typescript-plugin/index.d.ts", true)]
    #[case("/work/node_modules/typescript/node_modules/x/a.d.ts", true)]
    #[case("/work/src/node_modules.ts", false)]
    fn test_is_dependency_module(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(is_dependency_module(path), expected);
    }
}
