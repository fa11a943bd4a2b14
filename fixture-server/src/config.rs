//! Configuration module

use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::Direction;

/// Fixture server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Fixture document to replay (embedded demo fixture when unset)
    pub fixture_path: Option<PathBuf>,

    /// Samples whose prediction requests answer with a 500
    pub failing_samples: HashSet<(Direction, usize)>,

    /// Artificial delay added to every prediction request
    pub latency: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            fixture_path: None,
            failing_samples: HashSet::new(),
            latency: Duration::ZERO,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),

            fixture_path: env::var("FIXTURE_PATH").ok().map(PathBuf::from),

            failing_samples: env::var("FIXTURE_FAIL_SAMPLES")
                .map(|s| parse_failing_samples(&s))
                .unwrap_or_default(),

            latency: env::var("FIXTURE_LATENCY_MS")
                .ok()
                .and_then(|ms| ms.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(Duration::ZERO),
        }
    }

    /// Mark a sample as failing (builder style, used by tests and demos)
    pub fn with_failing_sample(mut self, direction: Direction, index: usize) -> Self {
        self.failing_samples.insert((direction, index));
        self
    }

    pub fn should_fail(&self, direction: Direction, index: usize) -> bool {
        self.failing_samples.contains(&(direction, index))
    }
}

/// Parse `direction:index` pairs separated by commas.
/// Malformed entries are skipped with a warning.
pub fn parse_failing_samples(raw: &str) -> HashSet<(Direction, usize)> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let parsed = entry.split_once(':').and_then(|(dir, idx)| {
                let direction = dir.trim().parse::<Direction>().ok()?;
                let index = idx.trim().parse::<usize>().ok()?;
                Some((direction, index))
            });
            if parsed.is_none() {
                tracing::warn!("Ignoring malformed FIXTURE_FAIL_SAMPLES entry: {}", entry);
            }
            parsed
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_failing_samples() {
        let parsed = parse_failing_samples("wesad_to_kemocon:3, kemocon_to_wesad:0,bogus,wesad_to_kemocon:x");

        assert_eq!(parsed.len(), 2);
        assert!(parsed.contains(&(Direction::WesadToKemocon, 3)));
        assert!(parsed.contains(&(Direction::KemoconToWesad, 0)));
    }

    #[test]
    fn test_should_fail() {
        let config = Config::default().with_failing_sample(Direction::WesadToKemocon, 2);

        assert!(config.should_fail(Direction::WesadToKemocon, 2));
        assert!(!config.should_fail(Direction::KemoconToWesad, 2));
    }
}
