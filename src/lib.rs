//! # retaggr
//!
//! Reverse image search aggregation across booru and image-lookup APIs.
//!
//! Given an image URL, retaggr asks every engine it has credentials for and
//! normalises their very different responses into one [`SearchResult`]:
//! a set of tags and a set of likely original sources.
//!
//! ## Design
//!
//! - A closed set of engines ([`EngineKind`]): Danbooru, e621, iqdb, Paheal
//!   and SauceNao, each implementing the [`Engine`] trait
//! - Engines are activated once, at construction, from the credentials
//!   present in [`ReverseSearchConfig`]; the registry never changes afterwards
//! - Multi-engine searches run sequentially, one request at a time, with an
//!   optional [`SearchListener`] awaited after every engine
//! - Results merge by set union, so the outcome does not depend on order
//!
//! ## Security
//!
//! - API keys never appear in logs, error messages or `Debug` output
//! - Requests are logged only at trace level

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod engines;
pub mod error;
pub mod http;
pub mod ratelimit;
pub mod types;

pub use config::ReverseSearchConfig;
pub use dispatch::{EngineCompletion, NoopListener, ReverseSearch, SearchListener, SearchOptions};
pub use engine::Engine;
pub use engines::BooruEngine;
pub use error::{Result, RetaggrError};
pub use types::{EngineDescriptor, EngineKind, SearchOption, SearchResult};

/// Reverse search `url` on every engine `config` activates.
///
/// Convenience wrapper that builds a [`ReverseSearch`] and runs
/// [`ReverseSearch::search_image_source`] with default [`SearchOptions`].
/// Build a [`ReverseSearch`] yourself to reuse it across searches.
///
/// # Errors
///
/// Returns [`RetaggrError::Config`] for invalid configuration, or the first
/// engine error encountered.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> retaggr::Result<()> {
/// let config = retaggr::ReverseSearchConfig {
///     min_score: Some(80.0),
///     ..Default::default()
/// };
/// let result = retaggr::search_image_source("https://example.com/image.png", &config).await?;
/// for tag in &result.tags {
///     println!("{tag}");
/// }
/// # Ok(())
/// # }
/// ```
pub async fn search_image_source(url: &str, config: &ReverseSearchConfig) -> Result<SearchResult> {
    ReverseSearch::new(config)?
        .search_image_source(url, &SearchOptions::default())
        .await
}
