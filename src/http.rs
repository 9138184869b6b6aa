//! Shared HTTP plumbing for engine requests.
//!
//! Each engine builds its own [`reqwest::Client`] once at activation so the
//! e621 engine can carry its identifying User-Agent while the others share
//! the default agent.

use std::time::Duration;

use crate::config::ReverseSearchConfig;
use crate::error::RetaggrError;
use crate::types::EngineKind;

/// User-Agent sent when the configuration does not override it.
pub const DEFAULT_USER_AGENT: &str = concat!("retaggr/", env!("CARGO_PKG_VERSION"));

/// Build a [`reqwest::Client`] for engine requests.
///
/// `user_agent` wins over the configured agent; pass `None` to use
/// `config.user_agent` or [`DEFAULT_USER_AGENT`].
///
/// # Errors
///
/// Returns [`RetaggrError::Http`] if the client cannot be constructed.
pub fn build_client(
    config: &ReverseSearchConfig,
    user_agent: Option<String>,
) -> Result<reqwest::Client, RetaggrError> {
    let ua = user_agent
        .or_else(|| config.user_agent.clone())
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned());

    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(ua)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| RetaggrError::Http(format!("failed to build HTTP client: {e}")))
}

/// Issue a GET with query parameters and return the body of a 2xx response.
///
/// Query values may contain credentials, so only the path is traced.
pub async fn get_text(
    client: &reqwest::Client,
    engine: EngineKind,
    url: &str,
    query: &[(&str, &str)],
) -> Result<String, RetaggrError> {
    tracing::trace!(%engine, url, "engine request");

    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| RetaggrError::Http(format!("{engine} request failed: {}", e.without_url())))?
        .error_for_status()
        .map_err(|e| RetaggrError::Http(format!("{engine} HTTP error: {}", e.without_url())))?;

    let body = response
        .text()
        .await
        .map_err(|e| RetaggrError::Http(format!("{engine} response read failed: {e}")))?;

    tracing::trace!(%engine, bytes = body.len(), "engine response received");
    Ok(body)
}

/// Deserialize a JSON body, labelling failures with the engine name.
pub fn parse_json<T: serde::de::DeserializeOwned>(
    engine: EngineKind,
    body: &str,
) -> Result<T, RetaggrError> {
    serde_json::from_str(body)
        .map_err(|e| RetaggrError::Parse(format!("{engine} returned malformed JSON: {e}")))
}
