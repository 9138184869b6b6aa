//! Engine implementations.
//!
//! Each module provides a struct implementing [`crate::engine::Engine`] for
//! one provider. [`BooruEngine`] closes over all of them so a registry can
//! hold any activated engine without trait objects.

pub mod danbooru;
pub mod e621;
pub mod iqdb;
pub mod paheal;
pub mod saucenao;

pub use danbooru::DanbooruEngine;
pub use e621::E621Engine;
pub use iqdb::IqdbEngine;
pub use paheal::PahealEngine;
pub use saucenao::SauceNaoEngine;

use crate::config::ReverseSearchConfig;
use crate::engine::Engine;
use crate::error::RetaggrError;
use crate::types::{EngineKind, SearchResult};

/// Any one of the built-in engines.
#[derive(Debug)]
pub enum BooruEngine {
    /// Danbooru.
    Danbooru(DanbooruEngine),
    /// e621.
    E621(E621Engine),
    /// iqdb.org.
    Iqdb(IqdbEngine),
    /// Paheal.
    Paheal(PahealEngine),
    /// SauceNao.
    SauceNao(SauceNaoEngine),
}

impl BooruEngine {
    /// Instantiate `kind` from configuration.
    ///
    /// Returns `Ok(None)` when the configuration lacks a field `kind` needs.
    ///
    /// # Errors
    ///
    /// Returns [`RetaggrError::Http`] if the engine's HTTP client cannot be built.
    pub fn from_config(
        kind: EngineKind,
        config: &ReverseSearchConfig,
    ) -> Result<Option<Self>, RetaggrError> {
        Ok(match kind {
            EngineKind::Danbooru => DanbooruEngine::from_config(config)?.map(Self::Danbooru),
            EngineKind::E621 => E621Engine::from_config(config)?.map(Self::E621),
            EngineKind::Iqdb => IqdbEngine::from_config(config)?.map(Self::Iqdb),
            EngineKind::Paheal => Some(Self::Paheal(PahealEngine::new())),
            EngineKind::SauceNao => SauceNaoEngine::from_config(config)?.map(Self::SauceNao),
        })
    }
}

impl Engine for BooruEngine {
    async fn search_image_source(&self, url: &str) -> Result<SearchResult, RetaggrError> {
        match self {
            Self::Danbooru(engine) => engine.search_image_source(url).await,
            Self::E621(engine) => engine.search_image_source(url).await,
            Self::Iqdb(engine) => engine.search_image_source(url).await,
            Self::Paheal(engine) => engine.search_image_source(url).await,
            Self::SauceNao(engine) => engine.search_image_source(url).await,
        }
    }

    async fn search_tag(&self, tag: &str) -> Result<SearchResult, RetaggrError> {
        match self {
            Self::Danbooru(engine) => engine.search_tag(tag).await,
            Self::E621(engine) => engine.search_tag(tag).await,
            Self::Iqdb(engine) => engine.search_tag(tag).await,
            Self::Paheal(engine) => engine.search_tag(tag).await,
            Self::SauceNao(engine) => engine.search_tag(tag).await,
        }
    }

    fn kind(&self) -> EngineKind {
        match self {
            Self::Danbooru(_) => EngineKind::Danbooru,
            Self::E621(_) => EngineKind::E621,
            Self::Iqdb(_) => EngineKind::Iqdb,
            Self::Paheal(_) => EngineKind::Paheal,
            Self::SauceNao(_) => EngineKind::SauceNao,
        }
    }
}

impl From<DanbooruEngine> for BooruEngine {
    fn from(engine: DanbooruEngine) -> Self {
        Self::Danbooru(engine)
    }
}

impl From<E621Engine> for BooruEngine {
    fn from(engine: E621Engine) -> Self {
        Self::E621(engine)
    }
}

impl From<IqdbEngine> for BooruEngine {
    fn from(engine: IqdbEngine) -> Self {
        Self::Iqdb(engine)
    }
}

impl From<PahealEngine> for BooruEngine {
    fn from(engine: PahealEngine) -> Self {
        Self::Paheal(engine)
    }
}

impl From<SauceNaoEngine> for BooruEngine {
    fn from(engine: SauceNaoEngine) -> Self {
        Self::SauceNao(engine)
    }
}
