//! iqdb engine: perceptual-hash lookup across several boorus.
//!
//! iqdb.org has no JSON API; the HTML result page is parsed with CSS
//! selectors. Each match is a table whose header row says what kind of
//! match it is, followed by a thumbnail (linked to the post, tags in the
//! `alt` text) and an `"NN% similarity"` row.

use scraper::{ElementRef, Html, Selector};

use crate::config::ReverseSearchConfig;
use crate::engine::{not_available, Engine};
use crate::error::RetaggrError;
use crate::http;
use crate::types::{EngineKind, SearchOption, SearchResult};

/// Production iqdb host.
pub const IQDB_HOST: &str = "https://iqdb.org";

/// Table headers that denote an actual match.
const MATCH_HEADERS: &[&str] = &["Best match", "Additional match"];

/// A single parsed match row.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct IqdbMatch {
    pub similarity: f64,
    pub link: Option<String>,
    pub tags: Vec<String>,
}

/// iqdb.org scraper, gated by the configured similarity percentage.
#[derive(Debug, Clone)]
pub struct IqdbEngine {
    client: reqwest::Client,
    host: String,
    min_score: f64,
}

impl IqdbEngine {
    /// Create an engine that keeps matches at or above `min_score` percent.
    ///
    /// # Errors
    ///
    /// Returns [`RetaggrError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &ReverseSearchConfig, min_score: f64) -> Result<Self, RetaggrError> {
        Ok(Self {
            client: http::build_client(config, None)?,
            host: IQDB_HOST.to_string(),
            min_score,
        })
    }

    /// Build from configuration, or `Ok(None)` if `min_score` is missing.
    pub fn from_config(config: &ReverseSearchConfig) -> Result<Option<Self>, RetaggrError> {
        config
            .min_score
            .map(|min_score| Self::new(config, min_score))
            .transpose()
    }

    /// Point the engine at another host (useful for testing with mock servers).
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }
}

impl Engine for IqdbEngine {
    async fn search_image_source(&self, url: &str) -> Result<SearchResult, RetaggrError> {
        let endpoint = format!("{}/", self.host);
        let html = http::get_text(&self.client, EngineKind::Iqdb, &endpoint, &[("url", url)]).await?;
        let matches = parse_iqdb_html(&html)?;
        Ok(select_matches(&matches, self.min_score))
    }

    async fn search_tag(&self, _tag: &str) -> Result<SearchResult, RetaggrError> {
        Err(not_available(EngineKind::Iqdb, SearchOption::Tag))
    }

    fn kind(&self) -> EngineKind {
        EngineKind::Iqdb
    }
}

/// Parse every match table out of an iqdb result page.
pub(crate) fn parse_iqdb_html(html: &str) -> Result<Vec<IqdbMatch>, RetaggrError> {
    let document = Html::parse_document(html);

    let table_sel = selector("#pages table")?;
    let header_sel = selector("th")?;
    let cell_sel = selector("td")?;
    let link_sel = selector("td.image a")?;
    let thumb_sel = selector("td.image img")?;

    let mut matches = Vec::new();

    for table in document.select(&table_sel) {
        let header = match table.select(&header_sel).next() {
            Some(th) => text_of(th),
            None => continue,
        };
        if !MATCH_HEADERS.contains(&header.as_str()) {
            continue;
        }

        let Some(similarity) = table
            .select(&cell_sel)
            .find_map(|td| parse_similarity(&text_of(td)))
        else {
            continue;
        };

        let link = table
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(absolute_link);

        let tags = table
            .select(&thumb_sel)
            .next()
            .and_then(|img| img.value().attr("alt"))
            .map(parse_alt_tags)
            .unwrap_or_default();

        matches.push(IqdbMatch {
            similarity,
            link,
            tags,
        });
    }

    tracing::debug!(count = matches.len(), "iqdb matches parsed");
    Ok(matches)
}

/// Apply the similarity cutoff and pick the most similar match's link.
pub(crate) fn select_matches(matches: &[IqdbMatch], min_score: f64) -> SearchResult {
    let mut result = SearchResult::new();
    let mut best: Option<&IqdbMatch> = None;

    for m in matches.iter().filter(|m| m.similarity >= min_score) {
        for tag in &m.tags {
            result.insert_tag(tag.as_str());
        }
        if m.link.is_some() && best.is_none_or(|b| m.similarity > b.similarity) {
            best = Some(m);
        }
    }

    if let Some(link) = best.and_then(|m| m.link.as_deref()) {
        result.insert_source(link);
    }
    result
}

fn selector(css: &str) -> Result<Selector, RetaggrError> {
    Selector::parse(css).map_err(|e| RetaggrError::Parse(format!("invalid selector {css}: {e:?}")))
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// `"94% similarity"` -> `94.0`.
fn parse_similarity(text: &str) -> Option<f64> {
    text.strip_suffix("% similarity")?.trim().parse().ok()
}

/// Thumbnail alt text looks like `"Rating: s Score: 12 Tags: 1girl solo"`.
fn parse_alt_tags(alt: &str) -> Vec<String> {
    alt.split_once("Tags:")
        .map(|(_, tags)| tags.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

fn absolute_link(href: &str) -> String {
    if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    }
}
