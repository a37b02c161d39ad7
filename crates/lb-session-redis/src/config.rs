//! Redis connection configuration.

use std::time::Duration;

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Connection URL (`redis://` or `rediss://`).
    pub url: String,
    /// Delay between reconnection attempts.
    pub reconnect_delay: Duration,
    /// Time after which a command fails instead of waiting for a
    /// connection.
    pub command_timeout: Duration,
    /// Key prefix for all session keys.
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379/0".to_string(),
            reconnect_delay: Duration::from_millis(2500),
            command_timeout: Duration::from_secs(2),
            key_prefix: "lb".to_string(),
        }
    }
}

impl RedisConfig {
    /// Creates a configuration for `url` with default values.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the key prefix.
    #[must_use]
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Sets the command timeout.
    #[must_use]
    pub const fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Sets the reconnection delay.
    #[must_use]
    pub const fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Formats a key with the configured prefix.
    #[must_use]
    pub fn prefixed_key(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.key_prefix, key)
        }
    }
}
