//! Core types for search results and engine identification.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::RetaggrError;

/// Normalised result of a reverse image or tag search.
///
/// Both sets are unordered and never contain blank entries; use the
/// insertion helpers rather than pushing into the sets directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Tags describing the image content.
    pub tags: HashSet<String>,
    /// URLs believed to be the original publication location.
    pub sources: HashSet<String>,
}

impl SearchResult {
    /// Create an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a result from tag and source iterators, dropping blank entries.
    pub fn from_parts<T, S>(tags: T, sources: S) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        let mut result = Self::new();
        for tag in tags {
            result.insert_tag(tag);
        }
        for source in sources {
            result.insert_source(source);
        }
        result
    }

    /// Insert a tag. Surrounding whitespace is trimmed; blank tags are ignored.
    ///
    /// Returns `true` if the tag was not already present.
    pub fn insert_tag(&mut self, tag: impl Into<String>) -> bool {
        insert_non_blank(&mut self.tags, tag.into())
    }

    /// Insert a source URL. Blank sources are ignored.
    ///
    /// Returns `true` if the source was not already present.
    pub fn insert_source(&mut self, source: impl Into<String>) -> bool {
        insert_non_blank(&mut self.sources, source.into())
    }

    /// Union another result into this one.
    ///
    /// `other` may have been filled through the public fields, so its
    /// entries go through the same trimming and blank filtering as inserts.
    pub fn merge(&mut self, other: &SearchResult) {
        for tag in &other.tags {
            self.insert_tag(tag.as_str());
        }
        for source in &other.sources {
            self.insert_source(source.as_str());
        }
    }

    /// Returns `true` when neither tags nor sources were found.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.sources.is_empty()
    }
}

fn insert_non_blank(set: &mut HashSet<String>, value: String) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.len() == value.len() {
        set.insert(value)
    } else {
        set.insert(trimmed.to_string())
    }
}

/// The closed set of engines retaggr knows how to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Danbooru: tag-rich booru with its own iqdb endpoint.
    Danbooru,
    /// e621: Danbooru fork with categorised tags.
    E621,
    /// iqdb.org: multi-booru perceptual-hash lookup.
    Iqdb,
    /// rule34.paheal.net: tags are encoded in the image file name.
    Paheal,
    /// SauceNao: broad multi-database reverse image search.
    SauceNao,
}

impl EngineKind {
    /// Returns the stable lowercase key used to address this engine.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Danbooru => "danbooru",
            Self::E621 => "e621",
            Self::Iqdb => "iqdb",
            Self::Paheal => "paheal",
            Self::SauceNao => "saucenao",
        }
    }

    /// Returns the static capability descriptor for this engine.
    pub fn descriptor(&self) -> EngineDescriptor {
        let (can_search_by_tag, download_required) = match self {
            Self::Danbooru | Self::E621 => (true, false),
            Self::Iqdb | Self::Paheal | Self::SauceNao => (false, false),
        };
        EngineDescriptor {
            name: self.name(),
            download_required,
            can_search_by_url: true,
            can_search_by_tag,
        }
    }

    /// Returns all engine variants, in activation order.
    pub fn all() -> &'static [EngineKind] {
        &[
            Self::Danbooru,
            Self::E621,
            Self::Iqdb,
            Self::Paheal,
            Self::SauceNao,
        ]
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EngineKind {
    type Err = RetaggrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| RetaggrError::NotAValidEngine(s.to_string()))
    }
}

/// Capabilities an engine declares up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineDescriptor {
    /// Unique engine key.
    pub name: &'static str,
    /// The engine needs the raw image bytes rather than a URL.
    pub download_required: bool,
    /// The engine can look an image up by its URL.
    pub can_search_by_url: bool,
    /// The engine can search by tag name.
    pub can_search_by_tag: bool,
}

/// Search modes an engine may or may not support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchOption {
    /// Reverse lookup of an image.
    Image,
    /// Lookup by tag name.
    Tag,
}

impl fmt::Display for SearchOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => f.write_str("image"),
            Self::Tag => f.write_str("tag"),
        }
    }
}
