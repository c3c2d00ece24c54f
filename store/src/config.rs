//! Store configuration.

use ratebook_common::{RatebookError, Result, DEFAULT_DECIMAL_SCALE, MAX_DECIMAL_SCALE};

/// Rate store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Database URL.
    pub database_url: String,
    /// Maximum pooled connections.
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection.
    pub acquire_timeout_secs: u64,
    /// Fractional digits kept for stored and reciprocal factors.
    pub decimal_scale: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/ratebook".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 5,
            decimal_scale: DEFAULT_DECIMAL_SCALE,
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }

        if let Ok(max) = std::env::var("RATEBOOK_MAX_CONNECTIONS") {
            if let Ok(max) = max.parse() {
                config.max_connections = max;
            }
        }

        if let Ok(secs) = std::env::var("RATEBOOK_ACQUIRE_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.acquire_timeout_secs = secs;
            }
        }

        if let Ok(scale) = std::env::var("RATEBOOK_DECIMAL_SCALE") {
            if let Ok(scale) = scale.parse() {
                config.decimal_scale = scale;
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.database_url.is_empty() {
            return Err(RatebookError::Configuration(
                "Database URL cannot be empty".to_string(),
            ));
        }

        if self.max_connections == 0 {
            return Err(RatebookError::Configuration(
                "Max connections cannot be 0".to_string(),
            ));
        }

        if self.decimal_scale > MAX_DECIMAL_SCALE {
            return Err(RatebookError::Configuration(format!(
                "Decimal scale {} exceeds maximum {}",
                self.decimal_scale, MAX_DECIMAL_SCALE
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.decimal_scale, 4);
    }

    #[test]
    fn test_invalid_config() {
        let mut config = StoreConfig::default();
        config.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = StoreConfig::default();
        config.decimal_scale = 29;
        assert!(matches!(
            config.validate(),
            Err(RatebookError::Configuration(_))
        ));
    }
}
