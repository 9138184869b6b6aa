//! e621 engine: Danbooru fork with categorised tags.
//!
//! e621 needs no API key for reads but rejects anonymous clients, so every
//! request carries an identifying User-Agent built from the application
//! name, version and account name.

use std::collections::HashMap;

use serde::Deserialize;

use crate::config::ReverseSearchConfig;
use crate::engine::Engine;
use crate::error::RetaggrError;
use crate::http;
use crate::types::{EngineKind, SearchResult};

use super::danbooru::parse_tag_listing;

/// Production e621 host.
pub const E621_HOST: &str = "https://e621.net";

#[derive(Debug, Deserialize)]
struct IqdbMatch {
    score: f64,
    post: E621Post,
}

#[derive(Debug, Deserialize)]
struct E621Post {
    /// Tag lists keyed by category (`general`, `artist`, `species`, ...).
    #[serde(default)]
    tags: HashMap<String, Vec<String>>,
    #[serde(default)]
    sources: Vec<String>,
}

/// e621 client identified by its User-Agent.
#[derive(Debug, Clone)]
pub struct E621Engine {
    client: reqwest::Client,
    host: String,
    min_score: f64,
}

impl E621Engine {
    /// Create an engine that identifies as `app_name/version (by username on e621)`.
    ///
    /// # Errors
    ///
    /// Returns [`RetaggrError::Http`] if the HTTP client cannot be built.
    pub fn new(
        config: &ReverseSearchConfig,
        username: &str,
        app_name: &str,
        version: &str,
        min_score: f64,
    ) -> Result<Self, RetaggrError> {
        let agent = user_agent(username, app_name, version);
        Ok(Self {
            client: http::build_client(config, Some(agent))?,
            host: E621_HOST.to_string(),
            min_score,
        })
    }

    /// Build from configuration, or `Ok(None)` if a required field is missing.
    pub fn from_config(config: &ReverseSearchConfig) -> Result<Option<Self>, RetaggrError> {
        match (
            &config.e621_username,
            &config.app_name,
            &config.version,
            config.min_score,
        ) {
            (Some(username), Some(app_name), Some(version), Some(min_score)) => {
                Self::new(config, username, app_name, version, min_score).map(Some)
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

/// The User-Agent format e621's API rules ask for.
pub fn user_agent(username: &str, app_name: &str, version: &str) -> String {
    format!("{app_name}/{version} (by {username} on e621)")
}

impl Engine for E621Engine {
    async fn search_image_source(&self, url: &str) -> Result<SearchResult, RetaggrError> {
        let endpoint = format!("{}/iqdb_queries.json", self.host);
        let body = http::get_text(&self.client, EngineKind::E621, &endpoint, &[("url", url)]).await?;
        parse_e621_iqdb(&body, self.min_score)
    }

    async fn search_tag(&self, tag: &str) -> Result<SearchResult, RetaggrError> {
        let endpoint = format!("{}/tags.json", self.host);
        let body = http::get_text(
            &self.client,
            EngineKind::E621,
            &endpoint,
            &[("search[name_matches]", tag)],
        )
        .await?;
        parse_tag_listing(EngineKind::E621, &body)
    }

    fn kind(&self) -> EngineKind {
        EngineKind::E621
    }
}

/// Normalise an e621 `iqdb_queries.json` body.
///
/// Tags from every category of every match at or above `min_score` are
/// merged. The source is the first non-blank source of the best match.
pub(crate) fn parse_e621_iqdb(body: &str, min_score: f64) -> Result<SearchResult, RetaggrError> {
    let matches: Vec<IqdbMatch> = http::parse_json(EngineKind::E621, body)?;

    let mut result = SearchResult::new();
    let mut best: Option<(f64, &str)> = None;

    for m in matches.iter().filter(|m| m.score >= min_score) {
        for tag in m.post.tags.values().flatten() {
            result.insert_tag(tag.as_str());
        }
        let source = m.post.sources.iter().find(|s| !s.trim().is_empty());
        if let Some(source) = source {
            if best.is_none_or(|(score, _)| m.score > score) {
                best = Some((m.score, source.as_str()));
            }
        }
    }

    if let Some((_, source)) = best {
        result.insert_source(source);
    }

    tracing::debug!(
        matches = matches.len(),
        tags = result.tags.len(),
        "e621 results parsed"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOCK_IQDB_JSON: &str = r#"[
        {"score": 91.2, "post": {
            "tags": {"general": ["solo", "fur"], "species": ["fox"], "artist": ["someone"]},
            "sources": ["", "https://www.furaffinity.net/view/1"]
        }},
        {"score": 96.0, "post": {
            "tags": {"general": ["solo", "smile"]},
            "sources": ["https://twitter.com/someone/status/2"]
        }},
        {"score": 12.0, "post": {
            "tags": {"general": ["unrelated"]},
            "sources": ["https://example.com/3"]
        }}
    ]"#;

    #[test]
    fn merges_tags_across_categories() {
        let result = parse_e621_iqdb(MOCK_IQDB_JSON, 90.0).expect("should parse");
        for tag in ["solo", "fur", "fox", "someone", "smile"] {
            assert!(result.tags.contains(tag), "missing {tag}");
        }
        assert!(!result.tags.contains("unrelated"));
        assert_eq!(result.tags.len(), 5);
    }

    #[test]
    fn highest_score_source_wins() {
        let result = parse_e621_iqdb(MOCK_IQDB_JSON, 90.0).expect("should parse");
        assert_eq!(result.sources.len(), 1);
        assert!(result.sources.contains("https://twitter.com/someone/status/2"));
    }

    #[test]
    fn skips_blank_sources() {
        let result = parse_e621_iqdb(
            r#"[{"score": 91.2, "post": {"tags": {}, "sources": ["", "https://www.furaffinity.net/view/1"]}}]"#,
            50.0,
        )
        .expect("should parse");
        assert_eq!(result.sources.len(), 1);
        assert!(result.sources.contains("https://www.furaffinity.net/view/1"));
    }

    #[test]
    fn nothing_above_threshold() {
        let result = parse_e621_iqdb(MOCK_IQDB_JSON, 99.0).expect("should parse");
        assert!(result.is_empty());
    }

    #[test]
    fn user_agent_format() {
        assert_eq!(
            user_agent("someone", "retaggr", "1.2"),
            "retaggr/1.2 (by someone on e621)"
        );
    }

    #[test]
    fn from_config_requires_min_score() {
        let config = ReverseSearchConfig {
            e621_username: Some("someone".into()),
            app_name: Some("retaggr".into()),
            version: Some("1.0".into()),
            ..Default::default()
        };
        assert!(E621Engine::from_config(&config).expect("build").is_none());

        let config = ReverseSearchConfig {
            min_score: Some(70.0),
            ..config
        };
        assert!(E621Engine::from_config(&config).expect("build").is_some());
    }
}
