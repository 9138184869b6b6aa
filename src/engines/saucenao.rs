//! SauceNao engine: reverse search across every SauceNao database.
//!
//! One request per search, asking all databases (`db=999`) for JSON output
//! (`output_type=2`). Only candidates above SauceNao's advisory
//! `minimum_similarity` are considered. Among those, the source comes from
//! the candidate whose database ranks best in [`SOURCE_INDEXES`].
//!
//! Database ids are listed at <https://saucenao.com/status.html>.

use std::fmt;
use std::time::Instant;

use serde::Deserialize;

use crate::config::ReverseSearchConfig;
use crate::engine::{not_available, Engine};
use crate::error::RetaggrError;
use crate::http;
use crate::ratelimit::{RateLimitDecision, RateLimitTracker, SHORT_WINDOW};
use crate::types::{EngineKind, SearchOption, SearchResult};

/// Production SauceNao host.
pub const SAUCENAO_HOST: &str = "https://saucenao.com";

/// Databases usable as a source, most preferred first.
///
/// - 5: Pixiv (original uploads, few reposts)
/// - 16: FAKKU (official redistribution)
/// - 37: MangaDex (unofficial, but accurate metadata)
/// - 34: DeviantArt (many reposts)
pub const SOURCE_INDEXES: [u32; 4] = [5, 16, 37, 34];

/// Databases whose entries carry booru ids tags could be fetched from
/// (Pixiv, Danbooru, Yande.re, Konachan, e621). Not used for extraction yet.
pub const TAG_INDEXES: [u32; 5] = [5, 9, 12, 26, 29];

#[derive(Debug, Deserialize)]
pub(crate) struct SauceNaoResponse {
    header: ResponseHeader,
    #[serde(default)]
    results: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseHeader {
    minimum_similarity: f64,
    #[serde(default)]
    short_remaining: Option<u32>,
    #[serde(default)]
    long_remaining: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    header: CandidateHeader,
    #[serde(default)]
    data: CandidateData,
}

#[derive(Debug, Deserialize)]
struct CandidateHeader {
    /// Reported as a string, e.g. `"93.41"`.
    similarity: String,
    index_id: u32,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateData {
    #[serde(default)]
    ext_urls: Vec<String>,
}

/// SauceNao API client with provider rate-limit tracking.
pub struct SauceNaoEngine {
    client: reqwest::Client,
    host: String,
    api_key: String,
    limits: RateLimitTracker,
}

impl SauceNaoEngine {
    /// Create an engine using `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`RetaggrError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &ReverseSearchConfig, api_key: impl Into<String>) -> Result<Self, RetaggrError> {
        Ok(Self {
            client: http::build_client(config, None)?,
            host: SAUCENAO_HOST.to_string(),
            api_key: api_key.into(),
            limits: RateLimitTracker::new(),
        })
    }

    /// Build from configuration, or `Ok(None)` if no API key is configured.
    pub fn from_config(config: &ReverseSearchConfig) -> Result<Option<Self>, RetaggrError> {
        config
            .saucenao_api_key
            .as_ref()
            .map(|key| Self::new(config, key))
            .transpose()
    }

    /// Point the engine at another host (useful for testing with mock servers).
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Rate-limit counters reported by the last response.
    pub fn rate_limits(&self) -> &RateLimitTracker {
        &self.limits
    }

    async fn wait_for_rate_limit(&self) -> Result<(), RetaggrError> {
        match self.limits.check(Instant::now()) {
            RateLimitDecision::Proceed => Ok(()),
            RateLimitDecision::WaitFor(delay) => {
                tracing::warn!(delay_ms = delay.as_millis() as u64, "SauceNao short limit reached, waiting");
                tokio::time::sleep(delay).await;
                Ok(())
            }
            RateLimitDecision::CoolingDown(retry_after) => Err(RetaggrError::EngineCooldown {
                engine: EngineKind::SauceNao,
                retry_after,
            }),
        }
    }
}

impl fmt::Debug for SauceNaoEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SauceNaoEngine")
            .field("host", &self.host)
            .field("api_key", &"<redacted>")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl Engine for SauceNaoEngine {
    async fn search_image_source(&self, url: &str) -> Result<SearchResult, RetaggrError> {
        self.wait_for_rate_limit().await?;

        let endpoint = format!("{}/search.php", self.host);
        tracing::trace!(url = %endpoint, "SauceNao search");

        let response = self
            .client
            .get(&endpoint)
            .query(&[
                ("db", "999"),
                ("api_key", self.api_key.as_str()),
                ("output_type", "2"),
                ("url", url),
            ])
            .send()
            .await
            .map_err(|e| RetaggrError::Http(format!("saucenao request failed: {}", e.without_url())))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            self.limits.record_throttled(Instant::now());
            tracing::warn!("SauceNao rejected request with 429");
            return Err(RetaggrError::EngineCooldown {
                engine: EngineKind::SauceNao,
                retry_after: SHORT_WINDOW,
            });
        }

        let body = response
            .error_for_status()
            .map_err(|e| RetaggrError::Http(format!("saucenao HTTP error: {}", e.without_url())))?
            .text()
            .await
            .map_err(|e| RetaggrError::Http(format!("saucenao response read failed: {e}")))?;

        let parsed: SauceNaoResponse = http::parse_json(EngineKind::SauceNao, &body)?;
        if let (Some(short), Some(long)) = (parsed.header.short_remaining, parsed.header.long_remaining) {
            self.limits.record(short, long, Instant::now());
        }

        index_parser(&parsed)
    }

    async fn search_tag(&self, _tag: &str) -> Result<SearchResult, RetaggrError> {
        Err(not_available(EngineKind::SauceNao, SearchOption::Tag))
    }

    fn kind(&self) -> EngineKind {
        EngineKind::SauceNao
    }
}

/// Normalise a SauceNao response into a result.
///
/// Tags are never produced; see [`TAG_INDEXES`].
pub(crate) fn index_parser(response: &SauceNaoResponse) -> Result<SearchResult, RetaggrError> {
    let source = select_source(response)?;
    tracing::debug!(
        candidates = response.results.len(),
        found = source.is_some(),
        "SauceNao results parsed"
    );
    Ok(SearchResult::from_parts(Vec::<String>::new(), source))
}

/// Pick the source URL of the best-ranked qualifying candidate.
///
/// A candidate qualifies when its database is in [`SOURCE_INDEXES`], its
/// similarity is strictly above the response's `minimum_similarity`, and it
/// carries at least one external URL. Similarity is only parsed for listed
/// databases. A later candidate replaces the current pick only if its
/// database ranks strictly better.
pub(crate) fn select_source(response: &SauceNaoResponse) -> Result<Option<String>, RetaggrError> {
    let threshold = response.header.minimum_similarity;

    let mut source = None;
    let mut best_rank = SOURCE_INDEXES.len();

    for candidate in &response.results {
        // Databases outside the priority list are never parsed.
        let Some(rank) = SOURCE_INDEXES
            .iter()
            .position(|id| *id == candidate.header.index_id)
        else {
            continue;
        };
        if parse_similarity(&candidate.header.similarity)? <= threshold {
            continue;
        }
        let Some(url) = candidate
            .data
            .ext_urls
            .first()
            .filter(|u| !u.trim().is_empty())
        else {
            continue;
        };
        if rank < best_rank {
            source = Some(url.clone());
            best_rank = rank;
        }
    }

    Ok(source)
}

fn parse_similarity(raw: &str) -> Result<f64, RetaggrError> {
    raw.trim()
        .parse()
        .map_err(|_| RetaggrError::Parse(format!("saucenao similarity is not a number: {raw:?}")))
}
