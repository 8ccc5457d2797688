//! Engine configuration.

use chrono::Duration;
use dripfeed_storage::validate_key;

/// Default time between a completion and the next unlock.
pub const DEFAULT_UNLOCK_INTERVAL_SECS: i64 = 5 * 60;

/// Default storage key for the progress record.
pub const DEFAULT_STORAGE_KEY: &str = "unlock_progress";

/// Configuration for the unlock engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Time that must pass after a completion before the next item unlocks
    pub unlock_interval: Duration,
    /// Key the progress record is stored under
    pub storage_key: String,
    /// Buffered change events per subscriber
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            unlock_interval: Duration::seconds(DEFAULT_UNLOCK_INTERVAL_SECS),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            event_capacity: 64,
        }
    }
}

impl EngineConfig {
    /// Set the unlock interval.
    pub fn with_unlock_interval(mut self, interval: Duration) -> Self {
        self.unlock_interval = interval;
        self
    }

    /// Set the storage key.
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Set the event buffer size.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Check the configuration before an engine is built from it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.unlock_interval < Duration::zero() {
            return Err(ConfigError::NegativeInterval(self.unlock_interval));
        }
        if validate_key(&self.storage_key).is_err() {
            return Err(ConfigError::InvalidStorageKey(self.storage_key.clone()));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::ZeroEventCapacity);
        }
        Ok(())
    }
}

/// Invalid engine configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Unlock interval is negative
    #[error("unlock interval must not be negative, got {0}")]
    NegativeInterval(Duration),

    /// Storage key not usable by the byte stores
    #[error("invalid storage key {0:?}: use letters, digits, '_' or '-'")]
    InvalidStorageKey(String),

    /// Broadcast channel needs room for at least one event
    #[error("event capacity must be at least 1")]
    ZeroEventCapacity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.unlock_interval, Duration::minutes(5));
        assert_eq!(config.storage_key, "unlock_progress");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::default()
            .with_unlock_interval(Duration::hours(24))
            .with_storage_key("caliph_stories")
            .with_event_capacity(8);
        assert_eq!(config.unlock_interval, Duration::hours(24));
        assert_eq!(config.storage_key, "caliph_stories");
        assert_eq!(config.event_capacity, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_is_valid() {
        let config = EngineConfig::default().with_unlock_interval(Duration::zero());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let negative = EngineConfig::default().with_unlock_interval(Duration::seconds(-1));
        assert!(matches!(negative.validate(), Err(ConfigError::NegativeInterval(_))));

        let bad_key = EngineConfig::default().with_storage_key("../progress");
        assert!(matches!(bad_key.validate(), Err(ConfigError::InvalidStorageKey(_))));

        let no_buffer = EngineConfig::default().with_event_capacity(0);
        assert!(matches!(no_buffer.validate(), Err(ConfigError::ZeroEventCapacity)));
    }
}
