//! Error types for the retaggr crate.
//!
//! Messages are stable and never include credentials, so they are safe to
//! surface to end users.

use std::time::Duration;

use crate::types::{EngineKind, SearchOption};

/// Errors that can occur while dispatching or running a search.
#[derive(Debug, thiserror::Error)]
pub enum RetaggrError {
    /// The engine name is not part of the known engine set.
    #[error("{0} is not a valid engine")]
    NotAValidEngine(String),

    /// The engine exists but its credentials were not configured.
    #[error("{0} is missing one or more needed API keys")]
    MissingApiKeys(EngineKind),

    /// The engine does not support the requested kind of search.
    #[error("{engine} cannot search by {option}")]
    NotAvailableSearchOption {
        /// Engine that was asked.
        engine: EngineKind,
        /// Search mode it lacks.
        option: SearchOption,
    },

    /// The provider's rate limit is exhausted.
    #[error("{engine} is cooling down, retry in {}s", .retry_after.as_secs())]
    EngineCooldown {
        /// Throttled engine.
        engine: EngineKind,
        /// How long until the provider accepts requests again.
        retry_after: Duration,
    },

    /// Every searched engine failed (only with failure isolation enabled).
    #[error("all engines failed: {0}")]
    AllEnginesFailed(String),

    /// An HTTP request to a provider failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A provider response could not be understood.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias for retaggr results.
pub type Result<T> = std::result::Result<T, RetaggrError>;
