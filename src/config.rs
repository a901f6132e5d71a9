use dotenvy::dotenv;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Room temperature, published and subscribed.
pub const ROOM_TOPIC: &str = "casa/habitacion1/temperatura";
/// Kitchen temperature, published only. Nothing in this crate consumes it.
pub const KITCHEN_TOPIC: &str = "case/cocina/temperatura";

pub const PUBLISH_INTERVAL: Duration = Duration::from_secs(5);

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 1883;
pub const DEFAULT_KEEP_ALIVE_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_keep_alive_secs: u64,
    pub mqtt_username: String,
    pub mqtt_password: String,
    pub mqtt_retry_interval_ms: u64,
    pub log_level: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable {0} is missing or invalid.")]
    MissingOrInvalid(String),
    #[error("Parsing error: {0}")]
    ParsingError(String),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mqtt_host: DEFAULT_HOST.to_string(),
            mqtt_port: DEFAULT_PORT,
            mqtt_keep_alive_secs: DEFAULT_KEEP_ALIVE_SECS,
            mqtt_username: String::new(),
            mqtt_password: String::new(),
            mqtt_retry_interval_ms: 5000,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Validate keep-alive and retry interval bounds.
    fn validate_timeouts(&self) -> Result<(), ConfigError> {
        const MIN_RETRY_MS: u64 = 100;
        const MAX_RETRY_MS: u64 = 1_000_000;
        // keep-alive goes on the wire as a u16
        const MIN_KEEP_ALIVE: u64 = 5;
        const MAX_KEEP_ALIVE: u64 = u16::MAX as u64;

        if !(MIN_RETRY_MS..=MAX_RETRY_MS).contains(&self.mqtt_retry_interval_ms) {
            return Err(ConfigError::ParsingError(format!(
                "MQTT_RETRY_INTERVAL_MS must be between {} and {} ms",
                MIN_RETRY_MS, MAX_RETRY_MS
            )));
        }

        if !(MIN_KEEP_ALIVE..=MAX_KEEP_ALIVE).contains(&self.mqtt_keep_alive_secs) {
            return Err(ConfigError::ParsingError(format!(
                "MQTT_KEEP_ALIVE_SECS must be between {} and {} s",
                MIN_KEEP_ALIVE, MAX_KEEP_ALIVE
            )));
        }

        Ok(())
    }

    /// Reads overrides from the process environment and an optional `.env`.
    ///
    /// Both are optional extras: with neither present this equals
    /// [`Config::default`], so the binaries run with no configuration at all.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup, falling back to the defaults
    /// for anything the lookup doesn't know.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let mqtt_host = match lookup("MQTT_HOST") {
            Some(host) if host.trim().is_empty() => {
                return Err(ConfigError::MissingOrInvalid("MQTT_HOST".to_string()))
            }
            Some(host) => host,
            None => defaults.mqtt_host,
        };

        let config = Self {
            mqtt_host,
            mqtt_port: match lookup("MQTT_PORT") {
                Some(port) => port.parse::<u16>().map_err(|_| {
                    ConfigError::ParsingError("MQTT_PORT must be a valid number".to_string())
                })?,
                None => defaults.mqtt_port,
            },
            mqtt_keep_alive_secs: match lookup("MQTT_KEEP_ALIVE_SECS") {
                Some(secs) => secs.parse::<u64>().map_err(|_| {
                    ConfigError::ParsingError(
                        "MQTT_KEEP_ALIVE_SECS must be a valid number".to_string(),
                    )
                })?,
                None => defaults.mqtt_keep_alive_secs,
            },
            mqtt_username: lookup("MQTT_USERNAME").unwrap_or_default(),
            mqtt_password: lookup("MQTT_PASSWORD").unwrap_or_default(),
            mqtt_retry_interval_ms: match lookup("MQTT_RETRY_INTERVAL_MS") {
                Some(ms) => ms.parse::<u64>().map_err(|_| {
                    ConfigError::ParsingError(
                        "MQTT_RETRY_INTERVAL_MS must be a valid number".to_string(),
                    )
                })?,
                None => defaults.mqtt_retry_interval_ms,
            },
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
        };

        config.validate_timeouts()?;

        Ok(config)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.mqtt_keep_alive_secs)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.mqtt_retry_interval_ms)
    }

    pub fn has_credentials(&self) -> bool {
        !self.mqtt_username.is_empty() && !self.mqtt_password.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.mqtt_host, "localhost");
        assert_eq!(config.mqtt_port, 1883);
        assert_eq!(config.keep_alive(), Duration::from_secs(60));
        assert!(!config.has_credentials());
    }

    #[test]
    fn overrides_are_applied() {
        let config = Config::from_lookup(lookup_from(&[
            ("MQTT_HOST", "broker.lan"),
            ("MQTT_PORT", "8883"),
            ("MQTT_KEEP_ALIVE_SECS", "30"),
            ("MQTT_USERNAME", "sensor"),
            ("MQTT_PASSWORD", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.mqtt_host, "broker.lan");
        assert_eq!(config.mqtt_port, 8883);
        assert_eq!(config.mqtt_keep_alive_secs, 30);
        assert!(config.has_credentials());
    }

    #[test]
    fn username_without_password_is_not_a_credential() {
        let config = Config::from_lookup(lookup_from(&[("MQTT_USERNAME", "sensor")])).unwrap();
        assert!(!config.has_credentials());
    }

    #[test]
    fn rejects_bad_port() {
        let err = Config::from_lookup(lookup_from(&[("MQTT_PORT", "70000")])).unwrap_err();
        assert!(matches!(err, ConfigError::ParsingError(_)));
    }

    #[test]
    fn rejects_blank_host() {
        let err = Config::from_lookup(lookup_from(&[("MQTT_HOST", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingOrInvalid(_)));
    }

    #[test]
    fn rejects_out_of_range_timeouts() {
        assert!(Config::from_lookup(lookup_from(&[("MQTT_RETRY_INTERVAL_MS", "10")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("MQTT_KEEP_ALIVE_SECS", "2")])).is_err());
    }

    #[test]
    fn topics_are_distinct() {
        assert_ne!(ROOM_TOPIC, KITCHEN_TOPIC);
        assert_eq!(PUBLISH_INTERVAL, Duration::from_secs(5));
    }
}
