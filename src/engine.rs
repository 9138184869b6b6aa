//! Trait definition for pluggable reverse search backends.
//!
//! Each engine (Danbooru, e621, iqdb, Paheal, SauceNao) implements
//! [`Engine`] so the dispatcher can treat them uniformly.

use crate::error::RetaggrError;
use crate::types::{EngineDescriptor, EngineKind, SearchOption, SearchResult};

/// A reverse search backend.
///
/// Implementors know their provider's request shape and normalise its
/// response into a [`SearchResult`]. Unsupported search modes fail with
/// [`RetaggrError::NotAvailableSearchOption`]; that is a declared capability
/// gap, not a defect.
///
/// All implementations must be `Send + Sync` so a registry can be shared
/// across tasks.
pub trait Engine: Send + Sync {
    /// Look up an image by URL and return its tags and best source.
    ///
    /// # Errors
    ///
    /// Returns [`RetaggrError`] if the request fails, the response cannot be
    /// parsed, or the engine cannot search by image.
    fn search_image_source(
        &self,
        url: &str,
    ) -> impl std::future::Future<Output = Result<SearchResult, RetaggrError>> + Send;

    /// Search by tag name.
    ///
    /// # Errors
    ///
    /// Returns [`RetaggrError::NotAvailableSearchOption`] for engines that
    /// cannot search tags, or a transport/parse error otherwise.
    fn search_tag(
        &self,
        tag: &str,
    ) -> impl std::future::Future<Output = Result<SearchResult, RetaggrError>> + Send;

    /// Returns which [`EngineKind`] this implementation represents.
    fn kind(&self) -> EngineKind;

    /// Returns the capability descriptor. Defaults to the kind's descriptor.
    fn descriptor(&self) -> EngineDescriptor {
        self.kind().descriptor()
    }

    /// Whether raw image bytes must be fetched before this engine can search.
    fn download_required(&self) -> bool {
        self.descriptor().download_required
    }
}

/// Shorthand for the error an engine returns for an unsupported mode.
pub fn not_available(engine: EngineKind, option: SearchOption) -> RetaggrError {
    RetaggrError::NotAvailableSearchOption { engine, option }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A mock engine for testing trait bounds and default methods.
    struct MockEngine {
        kind: EngineKind,
        result: Option<SearchResult>,
    }

    impl Engine for MockEngine {
        async fn search_image_source(&self, _url: &str) -> Result<SearchResult, RetaggrError> {
            self.result
                .clone()
                .ok_or_else(|| RetaggrError::Parse("mock engine failure".into()))
        }

        async fn search_tag(&self, _tag: &str) -> Result<SearchResult, RetaggrError> {
            Err(not_available(self.kind, SearchOption::Tag))
        }

        fn kind(&self) -> EngineKind {
            self.kind
        }
    }

    #[test]
    fn mock_engine_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MockEngine>();
    }

    #[tokio::test]
    async fn mock_engine_returns_result() {
        let engine = MockEngine {
            kind: EngineKind::Iqdb,
            result: Some(SearchResult::from_parts(["solo"], ["https://example.test/1"])),
        };
        let result = engine
            .search_image_source("https://img.test/a.png")
            .await
            .expect("should succeed");
        assert!(result.tags.contains("solo"));
    }

    #[tokio::test]
    async fn mock_engine_propagates_errors() {
        let engine = MockEngine {
            kind: EngineKind::Iqdb,
            result: None,
        };
        let err = engine.search_image_source("x").await.unwrap_err();
        assert!(err.to_string().contains("mock engine failure"));
    }

    #[tokio::test]
    async fn unsupported_tag_search_reports_option() {
        let engine = MockEngine {
            kind: EngineKind::SauceNao,
            result: None,
        };
        let err = engine.search_tag("solo").await.unwrap_err();
        assert!(matches!(
            err,
            RetaggrError::NotAvailableSearchOption {
                engine: EngineKind::SauceNao,
                option: SearchOption::Tag
            }
        ));
    }

    #[test]
    fn defaults_delegate_to_kind_descriptor() {
        let engine = MockEngine {
            kind: EngineKind::Danbooru,
            result: None,
        };
        assert_eq!(engine.descriptor(), EngineKind::Danbooru.descriptor());
        assert!(!engine.download_required());
    }
}
