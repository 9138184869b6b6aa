//! Paheal engine: tags are read straight from the image URL.
//!
//! Paheal names its files `"<post id> - <tag> <tag> ....<ext>"`, so a
//! direct image link already carries the full tag list. No request is made.

use percent_encoding::percent_decode_str;
use url::Url;

use crate::engine::{not_available, Engine};
use crate::error::RetaggrError;
use crate::types::{EngineKind, SearchOption, SearchResult};

/// Separator between the post id and the tag list in a file name.
const ID_SEPARATOR: &str = " - ";

/// URL-parsing Paheal engine. Always active; needs no credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct PahealEngine;

impl PahealEngine {
    /// Create the engine.
    pub fn new() -> Self {
        Self
    }
}

impl Engine for PahealEngine {
    async fn search_image_source(&self, url: &str) -> Result<SearchResult, RetaggrError> {
        let tags = parse_paheal_url(url)?;
        tracing::debug!(count = tags.len(), "Paheal tags parsed");
        Ok(SearchResult::from_parts(tags, Vec::<String>::new()))
    }

    async fn search_tag(&self, _tag: &str) -> Result<SearchResult, RetaggrError> {
        Err(not_available(EngineKind::Paheal, SearchOption::Tag))
    }

    fn kind(&self) -> EngineKind {
        EngineKind::Paheal
    }
}

/// Extract the tag list encoded in a Paheal image URL.
///
/// Returns an empty list when the file name does not follow the
/// `"<id> - <tags>"` convention.
pub(crate) fn parse_paheal_url(url: &str) -> Result<Vec<String>, RetaggrError> {
    let parsed = Url::parse(url)
        .map_err(|e| RetaggrError::Parse(format!("paheal: invalid image URL: {e}")))?;

    let segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    let file_name = percent_decode_str(segment).decode_utf8_lossy();

    let stem = match file_name.rsplit_once('.') {
        Some((stem, _ext)) => stem,
        None => &*file_name,
    };

    let Some((_post_id, tag_list)) = stem.split_once(ID_SEPARATOR) else {
        return Ok(Vec::new());
    };

    Ok(tag_list.split_whitespace().map(str::to_string).collect())
}
