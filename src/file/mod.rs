//! Parsed-file caching across compile passes.
//!
//! See [`cache`] for the reuse rules.

pub mod cache;

pub use cache::{is_dependency_module, FileObserver, FileRecord, FileVersionCache, Generation};
