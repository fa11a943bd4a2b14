//! Client configuration

use std::time::Duration;

use crate::constants;
use super::prediction::PacingPolicy;

/// Runtime configuration of the demo client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Prediction API base URL
    pub api_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Pause policy between batch requests
    pub pacing: PacingPolicy,
    /// Maximum samples per batch run
    pub batch_limit: usize,
    /// Recent predictions kept for display
    pub history_capacity: usize,
    /// Freshness window of cached dashboard data
    pub cache_ttl: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: constants::get_api_url(),
            request_timeout: constants::get_request_timeout(),
            pacing: PacingPolicy {
                interval: constants::get_pacing_interval(),
                backoff_factor: constants::get_pacing_backoff(),
                max_interval: constants::get_pacing_max(),
            },
            batch_limit: constants::get_batch_limit(),
            history_capacity: constants::get_history_capacity(),
            cache_ttl: constants::get_cache_ttl(),
        }
    }
}

impl ClientConfig {
    /// Config pointing at `api_url` with every other value at its default
    pub fn with_api_url(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Self::default()
        }
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trims_slash() {
        let config = ClientConfig::with_api_url("http://localhost:8000/");
        assert_eq!(config.base_url(), "http://localhost:8000");
    }
}
