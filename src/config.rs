//! Engine configuration.
//!
//! YAML-loadable settings for the polling engine. The one option the
//! host platform is expected to tune is `poll_interval`; the channel
//! capacities and the aggregate key are deployment knobs with safe
//! defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::StatsError;
use crate::persist::DEFAULT_PERSISTENCE_CAPACITY;
use crate::stats::AggregateKey;
use crate::transport::DEFAULT_OUTBOUND_CAPACITY;

/// Default poll interval (30 seconds).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Minimum allowed poll interval (1 second).
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Polling engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Interval between poll cycles (default: 30s, minimum: 1s).
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Outbound request channel capacity (default: 1024).
    pub outbound_capacity: usize,

    /// Persistence channel capacity (default: 4096).
    pub persistence_capacity: usize,

    /// Optional label appended to the aggregate-stats namespace.
    pub aggregate_label: Option<String>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            persistence_capacity: DEFAULT_PERSISTENCE_CAPACITY,
            aggregate_label: None,
        }
    }
}

impl PollConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `StatsError` if the file cannot be read, parsed, or
    /// validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StatsError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `StatsError::Config` if any field is invalid.
    pub fn validate(&self) -> Result<(), StatsError> {
        if self.outbound_capacity == 0 {
            return Err(StatsError::Config(
                "outbound_capacity must be positive".to_string(),
            ));
        }
        if self.persistence_capacity == 0 {
            return Err(StatsError::Config(
                "persistence_capacity must be positive".to_string(),
            ));
        }
        if let Some(label) = &self.aggregate_label {
            if label.is_empty() {
                return Err(StatsError::Config(
                    "aggregate_label must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Poll interval, clamped to the allowed minimum.
    pub fn poll_interval(&self) -> Duration {
        if self.poll_interval < MIN_POLL_INTERVAL {
            tracing::warn!(
                min_interval = ?MIN_POLL_INTERVAL,
                "Poll interval below minimum, clamping"
            );
            MIN_POLL_INTERVAL
        } else {
            self.poll_interval
        }
    }

    /// Aggregate namespace policy from the configured label.
    pub fn aggregate_key(&self) -> AggregateKey {
        match &self.aggregate_label {
            Some(label) => AggregateKey::Label(label.clone()),
            None => AggregateKey::SwitchId,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PollConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.outbound_capacity, DEFAULT_OUTBOUND_CAPACITY);
        assert_eq!(config.persistence_capacity, DEFAULT_PERSISTENCE_CAPACITY);
        assert_eq!(config.aggregate_key(), AggregateKey::SwitchId);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_interval_clamped_to_minimum() {
        let config = PollConfig {
            poll_interval: Duration::from_millis(100),
            ..Default::default()
        };
        assert_eq!(config.poll_interval(), MIN_POLL_INTERVAL);
    }

    #[test]
    fn test_load_from_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "poll_interval: 10s\naggregate_label: edge\noutbound_capacity: 64"
        )
        .unwrap();

        let config = PollConfig::load(file.path()).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.outbound_capacity, 64);
        assert_eq!(
            config.aggregate_key(),
            AggregateKey::Label("edge".to_string())
        );
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let config = PollConfig {
            outbound_capacity: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("outbound_capacity"));
    }

    #[test]
    fn test_validate_rejects_empty_label() {
        let config = PollConfig {
            aggregate_label: Some(String::new()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_bad_yaml_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "poll_interval: [not a duration").unwrap();
        assert!(PollConfig::load(file.path()).is_err());
    }
}
