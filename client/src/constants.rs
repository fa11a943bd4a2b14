//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Every value can be overridden from the environment (or a `.env` file).

use std::time::Duration;

/// Default prediction API base URL
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default per-request timeout (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default pause between consecutive batch requests (milliseconds)
pub const DEFAULT_PACING_MS: u64 = 300;

/// Default growth factor of the batch pause after consecutive failures.
/// 1.0 keeps the pause fixed.
pub const DEFAULT_PACING_BACKOFF: f64 = 1.0;

/// Upper bound of the batch pause (milliseconds)
pub const DEFAULT_PACING_MAX_MS: u64 = 5_000;

/// Hard limit for any configured batch pause (milliseconds)
pub const PACING_LIMIT_MS: u64 = 60_000;

/// Maximum number of samples in one batch run
pub const DEFAULT_BATCH_LIMIT: usize = 10;

/// Number of recent predictions kept in the history buffer
pub const DEFAULT_HISTORY_CAPACITY: usize = 5;

/// How long dashboard payloads stay fresh (seconds)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "NeuroFeel";

// ============================================
// Helper functions to read from env with fallback
// ============================================

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

/// Get API base URL from environment or use default
pub fn get_api_url() -> String {
    std::env::var("NEUROFEEL_API_URL")
        .unwrap_or_else(|_| DEFAULT_API_URL.to_string())
}

/// Get request timeout from environment or use default
pub fn get_request_timeout() -> Duration {
    Duration::from_secs(env_parse("NEUROFEEL_REQUEST_TIMEOUT_SECS").unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS))
}

/// Get batch pacing interval from environment or use default
pub fn get_pacing_interval() -> Duration {
    pacing_millis(env_parse("NEUROFEEL_PACING_MS").unwrap_or(DEFAULT_PACING_MS))
}

/// Get batch pacing backoff factor from environment or use default
pub fn get_pacing_backoff() -> f64 {
    env_parse("NEUROFEEL_PACING_BACKOFF").unwrap_or(DEFAULT_PACING_BACKOFF)
}

/// Get batch pacing ceiling from environment or use default
pub fn get_pacing_max() -> Duration {
    pacing_millis(env_parse("NEUROFEEL_PACING_MAX_MS").unwrap_or(DEFAULT_PACING_MAX_MS))
}

fn pacing_millis(ms: u64) -> Duration {
    Duration::from_millis(ms.min(PACING_LIMIT_MS))
}

/// Get batch size limit from environment or use default
pub fn get_batch_limit() -> usize {
    env_parse("NEUROFEEL_BATCH_LIMIT").unwrap_or(DEFAULT_BATCH_LIMIT)
}

/// Get history capacity from environment or use default
pub fn get_history_capacity() -> usize {
    env_parse("NEUROFEEL_HISTORY_CAPACITY").unwrap_or(DEFAULT_HISTORY_CAPACITY)
}

/// Get dashboard cache freshness from environment or use default
pub fn get_cache_ttl() -> Duration {
    Duration::from_secs(env_parse("NEUROFEEL_CACHE_TTL_SECS").unwrap_or(DEFAULT_CACHE_TTL_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pacing_millis_clamped() {
        assert_eq!(pacing_millis(300), Duration::from_millis(300));
        assert_eq!(pacing_millis(u64::MAX), Duration::from_millis(PACING_LIMIT_MS));
        assert!(Duration::from_millis(DEFAULT_PACING_MAX_MS) <= pacing_millis(u64::MAX));
    }
}
