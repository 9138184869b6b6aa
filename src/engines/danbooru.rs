//! Danbooru engine: score-gated reverse search through Danbooru's iqdb.
//!
//! Uses the authenticated `iqdb_queries.json` endpoint for image lookups and
//! `tags.json` for tag searches. Both require a username and API key.

use std::fmt;

use serde::Deserialize;

use crate::config::ReverseSearchConfig;
use crate::engine::Engine;
use crate::error::RetaggrError;
use crate::http;
use crate::types::{EngineKind, SearchResult};

/// Production Danbooru host.
pub const DANBOORU_HOST: &str = "https://danbooru.donmai.us";

/// One match from `iqdb_queries.json`.
#[derive(Debug, Deserialize)]
struct IqdbMatch {
    score: f64,
    post: DanbooruPost,
}

#[derive(Debug, Deserialize)]
struct DanbooruPost {
    #[serde(default)]
    tag_string: String,
    #[serde(default)]
    source: Option<String>,
}

/// One entry from a Danbooru-style `tags.json` listing.
#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// Authenticated Danbooru client.
#[derive(Clone)]
pub struct DanbooruEngine {
    client: reqwest::Client,
    host: String,
    username: String,
    api_key: String,
    min_score: f64,
}

impl DanbooruEngine {
    /// Create an engine with explicit credentials.
    ///
    /// # Errors
    ///
    /// Returns [`RetaggrError::Http`] if the HTTP client cannot be built.
    pub fn new(
        config: &ReverseSearchConfig,
        username: impl Into<String>,
        api_key: impl Into<String>,
        min_score: f64,
    ) -> Result<Self, RetaggrError> {
        Ok(Self {
            client: http::build_client(config, None)?,
            host: DANBOORU_HOST.to_string(),
            username: username.into(),
            api_key: api_key.into(),
            min_score,
        })
    }

    /// Build from configuration, or `Ok(None)` if a required field is missing.
    pub fn from_config(config: &ReverseSearchConfig) -> Result<Option<Self>, RetaggrError> {
        match (
            &config.danbooru_username,
            &config.danbooru_api_key,
            config.min_score,
        ) {
            (Some(username), Some(api_key), Some(min_score)) => {
                Self::new(config, username, api_key, min_score).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Point the engine at another host (useful for testing with mock servers).
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }
}

impl fmt::Debug for DanbooruEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DanbooruEngine")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("api_key", &"<redacted>")
            .field("min_score", &self.min_score)
            .finish_non_exhaustive()
    }
}

impl Engine for DanbooruEngine {
    async fn search_image_source(&self, url: &str) -> Result<SearchResult, RetaggrError> {
        let endpoint = format!("{}/iqdb_queries.json", self.host);
        let body = http::get_text(
            &self.client,
            EngineKind::Danbooru,
            &endpoint,
            &[
                ("url", url),
                ("login", self.username.as_str()),
                ("api_key", self.api_key.as_str()),
            ],
        )
        .await?;

        parse_danbooru_iqdb(&body, self.min_score)
    }

    async fn search_tag(&self, tag: &str) -> Result<SearchResult, RetaggrError> {
        let endpoint = format!("{}/tags.json", self.host);
        let body = http::get_text(
            &self.client,
            EngineKind::Danbooru,
            &endpoint,
            &[
                ("search[name_matches]", tag),
                ("login", self.username.as_str()),
                ("api_key", self.api_key.as_str()),
            ],
        )
        .await?;

        parse_tag_listing(EngineKind::Danbooru, &body)
    }

    fn kind(&self) -> EngineKind {
        EngineKind::Danbooru
    }
}

/// Normalise a Danbooru `iqdb_queries.json` body.
///
/// Matches scoring below `min_score` are dropped. The source is taken from
/// the highest-scoring remaining match that has one.
pub(crate) fn parse_danbooru_iqdb(body: &str, min_score: f64) -> Result<SearchResult, RetaggrError> {
    let matches: Vec<IqdbMatch> = http::parse_json(EngineKind::Danbooru, body)?;

    let mut result = SearchResult::new();
    let mut best: Option<(f64, &str)> = None;

    for m in matches.iter().filter(|m| m.score >= min_score) {
        for tag in m.post.tag_string.split_whitespace() {
            result.insert_tag(tag);
        }
        if let Some(source) = m.post.source.as_deref().filter(|s| !s.trim().is_empty()) {
            if best.is_none_or(|(score, _)| m.score > score) {
                best = Some((m.score, source));
            }
        }
    }

    if let Some((_, source)) = best {
        result.insert_source(source);
    }

    tracing::debug!(
        matches = matches.len(),
        tags = result.tags.len(),
        "Danbooru results parsed"
    );
    Ok(result)
}

/// Normalise a Danbooru-style `tags.json` listing into a tag set.
pub(crate) fn parse_tag_listing(engine: EngineKind, body: &str) -> Result<SearchResult, RetaggrError> {
    let entries: Vec<TagEntry> = http::parse_json(engine, body)?;
    Ok(SearchResult::from_parts(
        entries.into_iter().map(|e| e.name),
        Vec::<String>::new(),
    ))
}
