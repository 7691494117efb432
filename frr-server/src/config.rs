//! Server configuration from environment variables

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const BIND_VAR: &str = "FRR_BIND";
pub const DATA_DIR_VAR: &str = "FRR_DATA_DIR";
pub const FRAME_INTERVAL_VAR: &str = "FRR_FRAME_INTERVAL_MS";

const DEFAULT_BIND: ([u8; 4], u16) = ([0, 0, 0, 0], 9100);
const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{var} is not a valid socket address: {value:?}")]
    InvalidBind { var: &'static str, value: String },

    #[error("{var} must be a positive number of milliseconds, got {value:?}")]
    InvalidInterval { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Directory holding cached race payloads
    pub data_dir: PathBuf,
    /// Period of the playback frame clock
    pub frame_interval: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup; unset variables take defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(BIND_VAR) {
            config.bind = value.trim().parse().map_err(|_| ConfigError::InvalidBind {
                var: BIND_VAR,
                value: value.clone(),
            })?;
        }

        if let Some(value) = lookup(DATA_DIR_VAR).filter(|v| !v.trim().is_empty()) {
            config.data_dir = PathBuf::from(value);
        }

        if let Some(value) = lookup(FRAME_INTERVAL_VAR) {
            let ms = value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or_else(|| ConfigError::InvalidInterval {
                    var: FRAME_INTERVAL_VAR,
                    value: value.clone(),
                })?;
            config.frame_interval = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(DEFAULT_BIND),
            data_dir: default_data_dir(),
            frame_interval: Duration::from_millis(DEFAULT_FRAME_INTERVAL_MS),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("frr-replay")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind, "0.0.0.0:9100".parse().unwrap());
        assert_eq!(config.frame_interval, Duration::from_millis(16));
        assert!(config.data_dir.ends_with("frr-replay"));
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            (BIND_VAR, "127.0.0.1:8080"),
            (DATA_DIR_VAR, "/var/cache/frr"),
            (FRAME_INTERVAL_VAR, "33"),
        ]))
        .unwrap();
        assert_eq!(config.bind, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.data_dir, PathBuf::from("/var/cache/frr"));
        assert_eq!(config.frame_interval, Duration::from_millis(33));
    }

    #[test]
    fn test_invalid_bind() {
        let err = ServerConfig::from_lookup(lookup(&[(BIND_VAR, "localhost")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBind { .. }));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = ServerConfig::from_lookup(lookup(&[(FRAME_INTERVAL_VAR, "0")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidInterval {
                var: FRAME_INTERVAL_VAR,
                value: "0".to_string()
            }
        );
    }
}
