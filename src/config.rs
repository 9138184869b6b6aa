//! Reverse search configuration.
//!
//! [`ReverseSearchConfig`] carries the optional per-engine credentials that
//! decide which engines are activated, the shared `min_score` threshold, and
//! HTTP behaviour. Loading it from a file or the environment is left to the
//! caller; the struct deserializes from any serde format.

use std::fmt;

use serde::Deserialize;

use crate::error::RetaggrError;
use crate::types::EngineKind;

/// Configuration for a [`crate::ReverseSearch`] instance.
///
/// Every credential is optional. An engine is activated only when all of
/// its fields are present (see [`ReverseSearchConfig::activates`]).
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ReverseSearchConfig {
    /// Danbooru account name.
    pub danbooru_username: Option<String>,
    /// Danbooru API key.
    pub danbooru_api_key: Option<String>,
    /// e621 account name, sent in the identifying User-Agent.
    pub e621_username: Option<String>,
    /// Application name, sent in the e621 User-Agent.
    pub app_name: Option<String>,
    /// Application version, sent in the e621 User-Agent.
    pub version: Option<String>,
    /// SauceNao API key.
    pub saucenao_api_key: Option<String>,
    /// Minimum score (0-100) a match needs on score-bearing engines.
    pub min_score: Option<f64>,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
    /// Custom User-Agent. If `None`, a `retaggr/<version>` agent is sent.
    pub user_agent: Option<String>,
}

impl Default for ReverseSearchConfig {
    fn default() -> Self {
        Self {
            danbooru_username: None,
            danbooru_api_key: None,
            e621_username: None,
            app_name: None,
            version: None,
            saucenao_api_key: None,
            min_score: None,
            timeout_seconds: 10,
            user_agent: None,
        }
    }
}

impl ReverseSearchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `timeout_seconds` must be greater than 0
    /// - `min_score`, when set, must be a finite number in `0..=100`
    /// - credentials, when set, must not be blank
    pub fn validate(&self) -> Result<(), RetaggrError> {
        if self.timeout_seconds == 0 {
            return Err(RetaggrError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if let Some(score) = self.min_score {
            if !score.is_finite() || !(0.0..=100.0).contains(&score) {
                return Err(RetaggrError::Config(
                    "min_score must be between 0 and 100".into(),
                ));
            }
        }
        let fields = [
            ("danbooru_username", &self.danbooru_username),
            ("danbooru_api_key", &self.danbooru_api_key),
            ("e621_username", &self.e621_username),
            ("app_name", &self.app_name),
            ("version", &self.version),
            ("saucenao_api_key", &self.saucenao_api_key),
            ("user_agent", &self.user_agent),
        ];
        for (name, value) in fields {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(RetaggrError::Config(format!("{name} must not be blank")));
            }
        }
        Ok(())
    }

    /// Returns `true` if every field `engine` needs is present.
    pub fn activates(&self, engine: EngineKind) -> bool {
        match engine {
            EngineKind::Danbooru => {
                self.min_score.is_some()
                    && self.danbooru_username.is_some()
                    && self.danbooru_api_key.is_some()
            }
            EngineKind::E621 => {
                self.min_score.is_some()
                    && self.e621_username.is_some()
                    && self.app_name.is_some()
                    && self.version.is_some()
            }
            EngineKind::Iqdb => self.min_score.is_some(),
            EngineKind::Paheal => true,
            EngineKind::SauceNao => self.saucenao_api_key.is_some(),
        }
    }
}

impl fmt::Debug for ReverseSearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("ReverseSearchConfig")
            .field("danbooru_username", &self.danbooru_username)
            .field("danbooru_api_key", &redact(&self.danbooru_api_key))
            .field("e621_username", &self.e621_username)
            .field("app_name", &self.app_name)
            .field("version", &self.version)
            .field("saucenao_api_key", &redact(&self.saucenao_api_key))
            .field("min_score", &self.min_score)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}
