use envconfig::Envconfig;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use validator::{Validate, ValidationError};

use crate::admission::AdmissionSettings;
use crate::domains::SearchLimits;
use crate::error::ConfigError;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Envconfig, Validate, Clone)]
pub struct Config {
    /// Server bind address
    #[envconfig(from = "BIND_ADDR", default = "127.0.0.1:8081")]
    pub bind_addr: SocketAddr,

    /// Default log level when RUST_LOG is unset
    #[envconfig(from = "LOG_LEVEL", default = "info")]
    #[validate(custom(function = "validate_log_level"))]
    pub log_level: String,

    /// Sustained requests per second per client
    #[envconfig(from = "RATE_LIMIT_PER_SECOND", default = "10")]
    #[validate(range(exclusive_min = 0.0, max = 1_000_000.0))]
    pub rate_limit_per_second: f64,

    /// Burst capacity per client
    #[envconfig(from = "RATE_LIMIT_BURST", default = "20")]
    #[validate(range(min = 1))]
    pub rate_limit_burst: u32,

    /// Idle seconds before a client bucket is reclaimed; 0 keeps buckets forever
    #[envconfig(from = "RATE_LIMIT_TTL_SECS", default = "600")]
    pub rate_limit_ttl_secs: u64,

    /// Seconds between reclamation sweeps; 0 disables the sweep
    #[envconfig(from = "RATE_LIMIT_RECLAIM_INTERVAL_SECS", default = "60")]
    pub rate_limit_reclaim_interval_secs: u64,

    /// Identify clients by X-Forwarded-For / X-Real-IP instead of the peer address
    #[envconfig(from = "TRUST_FORWARDED_HEADERS", default = "false")]
    pub trust_forwarded_headers: bool,

    /// Page size when the request has none
    #[envconfig(from = "SEARCH_DEFAULT_LIMIT", default = "20")]
    #[validate(range(min = 1))]
    pub search_default_limit: u32,

    /// Hard cap on page size
    #[envconfig(from = "SEARCH_MAX_LIMIT", default = "100")]
    #[validate(range(min = 1, max = 1000))]
    pub search_max_limit: u32,

    /// Deadline for one search in milliseconds; 0 disables it
    #[envconfig(from = "SEARCH_TIMEOUT_MS", default = "5000")]
    pub search_timeout_ms: u64,

    /// JSON file with initial documents; empty starts with no data
    #[envconfig(from = "SEED_PATH", default = "")]
    pub seed_path: String,

    /// Enable request tracing
    #[envconfig(from = "ENABLE_TRACING", default = "true")]
    pub enable_tracing: bool,
}

impl Config {
    /// Load configuration from environment variables and validate it
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Config::init_from_env()?;
        config.check()?;
        Ok(config)
    }

    /// Field rules plus checks that span several fields
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;

        if self.search_default_limit > self.search_max_limit {
            return Err(ConfigError::Inconsistent(format!(
                "SEARCH_DEFAULT_LIMIT ({}) exceeds SEARCH_MAX_LIMIT ({})",
                self.search_default_limit, self.search_max_limit
            )));
        }

        Ok(())
    }

    pub fn admission_settings(&self) -> AdmissionSettings {
        AdmissionSettings {
            rate_per_second: self.rate_limit_per_second,
            burst: self.rate_limit_burst,
            ttl: Duration::from_secs(self.rate_limit_ttl_secs),
            reclaim_interval: Duration::from_secs(self.rate_limit_reclaim_interval_secs),
        }
    }

    pub fn search_limits(&self) -> SearchLimits {
        SearchLimits {
            default_limit: self.search_default_limit,
            max_limit: self.search_max_limit,
        }
    }

    pub fn search_deadline(&self) -> Option<Duration> {
        (self.search_timeout_ms > 0).then(|| Duration::from_millis(self.search_timeout_ms))
    }

    pub fn seed_path(&self) -> Option<&Path> {
        let trimmed = self.seed_path.trim();
        (!trimmed.is_empty()).then(|| Path::new(trimmed))
    }
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    if LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(ValidationError::new("log_level"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, envconfig::Error> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::init_from_hashmap(&env)
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert!(config.check().is_ok());
        assert_eq!(config.bind_addr, "127.0.0.1:8081".parse().unwrap());

        let admission = config.admission_settings();
        assert_eq!(admission.rate_per_second, 10.0);
        assert_eq!(admission.burst, 20);
        assert_eq!(admission.ttl, Duration::from_secs(600));
        assert_eq!(admission.reclaim_interval, Duration::from_secs(60));

        assert_eq!(config.search_limits(), SearchLimits::default());
        assert_eq!(config.search_deadline(), Some(Duration::from_secs(5)));
        assert_eq!(config.seed_path(), None);
    }

    #[test]
    fn test_zero_rate_rejected() {
        let config = config_from(&[("RATE_LIMIT_PER_SECOND", "0")]).unwrap();
        assert!(matches!(config.check(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_zero_burst_rejected() {
        let config = config_from(&[("RATE_LIMIT_BURST", "0")]).unwrap();
        assert!(config.check().is_err());
    }

    #[test]
    fn test_zero_ttl_disables_reclamation() {
        let config = config_from(&[("RATE_LIMIT_TTL_SECS", "0")]).unwrap();
        assert!(config.check().is_ok());
        assert!(!config.admission_settings().reclamation_enabled());
    }

    #[test]
    fn test_default_limit_above_max_rejected() {
        let config = config_from(&[("SEARCH_DEFAULT_LIMIT", "50"), ("SEARCH_MAX_LIMIT", "10")]).unwrap();
        assert!(matches!(config.check(), Err(ConfigError::Inconsistent(_))));
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let config = config_from(&[("LOG_LEVEL", "chatty")]).unwrap();
        assert!(config.check().is_err());
    }

    #[test]
    fn test_disabled_deadline() {
        let config = config_from(&[("SEARCH_TIMEOUT_MS", "0")]).unwrap();
        assert_eq!(config.search_deadline(), None);
    }

    #[test]
    fn test_malformed_bind_address() {
        assert!(config_from(&[("BIND_ADDR", "localhost")]).is_err());
    }
}
