//! Engine registry and sequential dispatcher.
//!
//! [`ReverseSearch`] is built once from configuration and never changes
//! afterwards. Searches run engine by engine, each fully awaited (including
//! its listener notification) before the next starts. Results are merged by
//! set union, so the final result does not depend on dispatch order.

use std::collections::HashSet;

use crate::config::ReverseSearchConfig;
use crate::engine::Engine;
use crate::engines::BooruEngine;
use crate::error::RetaggrError;
use crate::types::{EngineKind, SearchResult};

use super::listener::{EngineCompletion, NoopListener, SearchListener};

/// Per-call switches for [`ReverseSearch::search_image_source`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Also search engines that need the image downloaded first.
    pub download: bool,
    /// Engines to leave out of this search.
    pub skip: Vec<EngineKind>,
    /// Log and skip failing engines instead of aborting the whole search.
    pub isolate_failures: bool,
}

impl SearchOptions {
    /// Include engines that require a download.
    pub fn with_download(mut self, download: bool) -> Self {
        self.download = download;
        self
    }

    /// Leave `engine` out of the search.
    pub fn skip(mut self, engine: EngineKind) -> Self {
        if !self.skip.contains(&engine) {
            self.skip.push(engine);
        }
        self
    }

    /// Leave the engine called `name` out of the search.
    ///
    /// # Errors
    ///
    /// Returns [`RetaggrError::NotAValidEngine`] for unknown names.
    pub fn skip_named(self, name: &str) -> Result<Self, RetaggrError> {
        Ok(self.skip(name.parse()?))
    }

    /// Keep going when an engine fails.
    pub fn with_isolated_failures(mut self, isolate: bool) -> Self {
        self.isolate_failures = isolate;
        self
    }
}

/// Registry of activated engines plus the dispatch logic over them.
///
/// The default engine type is [`BooruEngine`]; [`ReverseSearch::from_engines`]
/// accepts any other [`Engine`] implementation.
#[derive(Debug)]
pub struct ReverseSearch<E = BooruEngine> {
    engines: Vec<E>,
}

impl ReverseSearch<BooruEngine> {
    /// Validate `config` and activate every engine whose fields are present.
    ///
    /// Engines are activated, and later searched, in [`EngineKind::all`] order.
    ///
    /// # Errors
    ///
    /// Returns [`RetaggrError::Config`] for invalid configuration, or
    /// [`RetaggrError::Http`] if an HTTP client cannot be built.
    pub fn new(config: &ReverseSearchConfig) -> Result<Self, RetaggrError> {
        config.validate()?;

        let mut engines = Vec::new();
        for kind in EngineKind::all() {
            match BooruEngine::from_config(*kind, config)? {
                Some(engine) => {
                    tracing::debug!(engine = %kind, "engine activated");
                    engines.push(engine);
                }
                None => tracing::debug!(engine = %kind, "engine not configured"),
            }
        }

        Ok(Self { engines })
    }
}

impl<E: Engine> ReverseSearch<E> {
    /// Build a registry from already constructed engines, kept in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`RetaggrError::Config`] if two engines share a kind.
    pub fn from_engines(engines: impl IntoIterator<Item = E>) -> Result<Self, RetaggrError> {
        let engines: Vec<E> = engines.into_iter().collect();
        let mut seen = HashSet::new();
        for engine in &engines {
            if !seen.insert(engine.kind()) {
                return Err(RetaggrError::Config(format!(
                    "engine {} registered twice",
                    engine.kind()
                )));
            }
        }
        Ok(Self { engines })
    }

    /// Activated engines, in dispatch order.
    pub fn engines(&self) -> Vec<EngineKind> {
        self.engines.iter().map(Engine::kind).collect()
    }

    /// Returns `true` if `kind` was activated.
    pub fn is_active(&self, kind: EngineKind) -> bool {
        self.get(kind).is_some()
    }

    fn get(&self, kind: EngineKind) -> Option<&E> {
        self.engines.iter().find(|e| e.kind() == kind)
    }

    fn resolve(&self, kind: EngineKind) -> Result<&E, RetaggrError> {
        self.get(kind).ok_or(RetaggrError::MissingApiKeys(kind))
    }

    /// Reverse search one engine, addressed by name.
    ///
    /// # Errors
    ///
    /// - [`RetaggrError::NotAValidEngine`] if `engine` names no known engine
    /// - [`RetaggrError::MissingApiKeys`] if it is known but not activated
    /// - whatever the engine itself returns
    pub async fn search_image(&self, engine: &str, url: &str) -> Result<SearchResult, RetaggrError> {
        let kind: EngineKind = engine.parse()?;
        self.search_engine(kind, url).await
    }

    /// Reverse search one engine, addressed by kind.
    ///
    /// # Errors
    ///
    /// Same as [`ReverseSearch::search_image`], minus the name check.
    pub async fn search_engine(&self, kind: EngineKind, url: &str) -> Result<SearchResult, RetaggrError> {
        self.resolve(kind)?.search_image_source(url).await
    }

    /// Tag search on one engine, addressed by name.
    ///
    /// # Errors
    ///
    /// Same as [`ReverseSearch::search_image`], plus
    /// [`RetaggrError::NotAvailableSearchOption`] for image-only engines.
    pub async fn search_tag(&self, engine: &str, tag: &str) -> Result<SearchResult, RetaggrError> {
        let kind: EngineKind = engine.parse()?;
        self.resolve(kind)?.search_tag(tag).await
    }

    /// Search every activated engine and merge the results.
    ///
    /// # Errors
    ///
    /// See [`ReverseSearch::search_image_source_with_listener`].
    pub async fn search_image_source(
        &self,
        url: &str,
        options: &SearchOptions,
    ) -> Result<SearchResult, RetaggrError> {
        self.search_image_source_with_listener(url, options, &NoopListener)
            .await
    }

    /// Search every activated engine, notifying `listener` after each one.
    ///
    /// Engines listed in `options.skip` are passed over, as are engines that
    /// need a download unless `options.download` is set. Each remaining
    /// engine runs to completion, then `listener` receives that engine's own
    /// result and is awaited, before the next engine starts.
    ///
    /// # Errors
    ///
    /// By default the first engine error aborts the search and is returned
    /// as is. With `options.isolate_failures`, failing engines are logged and
    /// skipped (the listener is not told about them), and
    /// [`RetaggrError::AllEnginesFailed`] is returned only if every searched
    /// engine failed.
    pub async fn search_image_source_with_listener<L: SearchListener>(
        &self,
        url: &str,
        options: &SearchOptions,
        listener: &L,
    ) -> Result<SearchResult, RetaggrError> {
        let mut merged = SearchResult::new();
        let mut searched = 0usize;
        let mut errors: Vec<String> = Vec::new();

        for engine in &self.engines {
            let kind = engine.kind();
            if options.skip.contains(&kind) {
                tracing::trace!(engine = %kind, "engine skipped by caller");
                continue;
            }
            if engine.download_required() && !options.download {
                tracing::trace!(engine = %kind, "engine needs a download, skipped");
                continue;
            }

            searched += 1;
            let result = match engine.search_image_source(url).await {
                Ok(result) => result,
                Err(err) if options.isolate_failures => {
                    tracing::warn!(engine = %kind, error = %err, "engine search failed");
                    errors.push(format!("{kind}: {err}"));
                    continue;
                }
                Err(err) => return Err(err),
            };

            tracing::debug!(
                engine = %kind,
                tags = result.tags.len(),
                sources = result.sources.len(),
                "engine search complete"
            );
            merged.merge(&result);
            listener
                .on_engine_complete(EngineCompletion {
                    engine: kind,
                    result,
                })
                .await;
        }

        if searched > 0 && errors.len() == searched {
            return Err(RetaggrError::AllEnginesFailed(errors.join("; ")));
        }

        Ok(merged)
    }

    /// Search every activated engine and return only the merged tags.
    ///
    /// # Errors
    ///
    /// Same as [`ReverseSearch::search_image_source_with_listener`].
    #[deprecated(note = "use `search_image_source`, which also returns sources")]
    pub async fn reverse_search<L: SearchListener>(
        &self,
        url: &str,
        download: bool,
        listener: &L,
    ) -> Result<HashSet<String>, RetaggrError> {
        let options = SearchOptions::default().with_download(download);
        self.search_image_source_with_listener(url, &options, listener)
            .await
            .map(|result| result.tags)
    }
}
