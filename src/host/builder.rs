//! Builder pattern for `Host`.

use crate::artifact::{ArtifactPostProcessor, BasicMinifier, MarkupMinifier, MarkupValidator, NoValidation};
use crate::config::HostConfig;
use crate::diagnostic::HostError;
use crate::file::{FileObserver, FileVersionCache};
use crate::path::{probe_case_sensitivity, PathCanonicalizer, PathMapper};

use super::contract::CompilerEngine;
use super::core::Host;

/// Builder for configuring `Host`.
///
/// Use `Host::builder()` to create a builder.
pub struct HostBuilder<E: CompilerEngine> {
    engine: E,
    config: HostConfig,
    minifier: Box<dyn MarkupMinifier>,
    validator: Box<dyn MarkupValidator>,
    roots: Vec<String>,
    observers: Vec<FileObserver>,
}

impl<E: CompilerEngine> HostBuilder<E> {
    pub(crate) fn new(engine: E, config: HostConfig) -> Self {
        Self {
            engine,
            config,
            minifier: Box::new(BasicMinifier),
            validator: Box::new(NoValidation),
            roots: Vec::new(),
            observers: Vec::new(),
        }
    }

    /// Use an external markup minifier instead of [`BasicMinifier`].
    pub fn with_minifier(mut self, minifier: impl MarkupMinifier + 'static) -> Self {
        self.minifier = Box::new(minifier);
        self
    }

    /// Validate markup templates; warnings are logged, never fatal.
    pub fn with_validator(mut self, validator: impl MarkupValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    /// Root file names compiled on every pass.
    pub fn with_roots<I, S>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roots = roots.into_iter().map(Into::into).collect();
        self
    }

    /// Call `observer` every time a file is registered or reused.
    pub fn on_file(mut self, observer: impl FnMut(&crate::path::CanonicalPath, &str) + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Build the `Host`.
    ///
    /// Probes case sensitivity (unless configured), resolves the directory
    /// roots, and prepares the hot-reload bootstrap.
    pub fn build(self) -> Result<Host<E>, HostError> {
        let current_dir = std::path::absolute(&self.config.current_dir)?;
        let case_sensitive = self
            .config
            .case_sensitive
            .unwrap_or_else(|| probe_case_sensitivity(&current_dir));

        let canonicalizer = PathCanonicalizer::new(&current_dir, case_sensitive);
        let mapper = PathMapper::new(
            canonicalizer,
            &self.config.root_dir.to_string_lossy(),
            &self.config.out_dir.to_string_lossy(),
        );
        let post = ArtifactPostProcessor::new(&self.config, &current_dir, self.minifier, self.validator)?;

        let mut cache = FileVersionCache::new();
        for observer in self.observers {
            cache.subscribe(observer);
        }

        tracing::debug!(
            current_dir = %mapper.roots().current_dir,
            source_root = %mapper.roots().source_root,
            output_root = %mapper.roots().output_root,
            case_sensitive,
            "Host created"
        );
        Ok(Host::new(self.engine, self.config.target, mapper, cache, post, self.roots))
    }
}
