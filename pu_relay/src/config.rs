//! Relay configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use std::net::SocketAddr;

pub const DEFAULT_BIND: &str = "127.0.0.1:7878";

/// Complete relay configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Relay bind address
    pub bind: SocketAddr,
    /// Rooms hosted at once before `register` is refused
    pub max_rooms: usize,
    /// Frames a single socket may send per second
    pub frames_per_second: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 7878)),
            max_rooms: 1024,
            frames_per_second: 50,
        }
    }
}

impl RelayConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but can't be parsed
    pub fn from_env(bind_override: Option<SocketAddr>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env("POCKET_UNO_BIND")?.unwrap_or(defaults.bind),
        };

        let config = Self {
            bind,
            max_rooms: parse_env("RELAY_MAX_ROOMS")?.unwrap_or(defaults.max_rooms),
            frames_per_second: parse_env("RELAY_FRAMES_PER_SECOND")?
                .unwrap_or(defaults.frames_per_second),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rooms == 0 {
            return Err(ConfigError::Invalid {
                var: "RELAY_MAX_ROOMS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.frames_per_second == 0 {
            return Err(ConfigError::Invalid {
                var: "RELAY_FRAMES_PER_SECOND".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Parses an environment variable if it is set
fn parse_env<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|error: T::Err| ConfigError::Invalid {
                var: key.to_string(),
                reason: error.to_string(),
            }),
        Err(_) => Ok(None),
    }
}
