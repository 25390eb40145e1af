//! Cache configuration

use crate::{ConfigError, StrataError, StrataResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default capacity of each sub-cache.
pub const DEFAULT_MAX_SIZE: usize = 100;

/// Default entry lifetime (5 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_millis(300_000);

/// Shortest accepted TTL. Configs carry the TTL in whole milliseconds.
pub const MIN_TTL: Duration = Duration::from_millis(1);

/// Configuration for the caching storage decorator.
///
/// `max_size` is applied to each of the three sub-caches independently; the
/// caches do not share one pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Capacity of each sub-cache.
    pub max_size: usize,
    /// Default entry lifetime, serialized as milliseconds.
    #[serde(rename = "ttl_ms", with = "duration_ms")]
    pub ttl: Duration,
    /// Whether existence checks are cached.
    pub cache_exists: bool,
    /// Whether directory listings are cached.
    pub cache_dir_listing: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            ttl: DEFAULT_TTL,
            cache_exists: true,
            cache_dir_listing: true,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-sub-cache capacity.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the default entry TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Enable or disable the existence sub-cache.
    pub fn with_cache_exists(mut self, enabled: bool) -> Self {
        self.cache_exists = enabled;
        self
    }

    /// Enable or disable the directory-listing sub-cache.
    pub fn with_cache_dir_listing(mut self, enabled: bool) -> Self {
        self.cache_dir_listing = enabled;
        self
    }

    /// Validate the configuration.
    /// Returns Ok(()) if valid, Err(StrataError::Config) if invalid.
    ///
    /// Validates:
    /// - max_size > 0
    /// - ttl is at least [`MIN_TTL`]
    pub fn validate(&self) -> StrataResult<()> {
        if self.max_size == 0 {
            return Err(StrataError::Config(ConfigError::InvalidValue {
                field: "max_size".to_string(),
                value: self.max_size.to_string(),
                reason: "max_size must be greater than 0".to_string(),
            }));
        }

        if self.ttl < MIN_TTL {
            return Err(StrataError::Config(ConfigError::InvalidValue {
                field: "ttl".to_string(),
                value: format!("{:?}", self.ttl),
                reason: "ttl must be at least 1ms".to_string(),
            }));
        }

        Ok(())
    }

    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `STRATA_CACHE_MAX_SIZE`: Capacity of each sub-cache (default: 100)
    /// - `STRATA_CACHE_TTL_MS`: Entry lifetime in milliseconds (default: 300000)
    /// - `STRATA_CACHE_EXISTS`: "true" or "false" (default: true)
    /// - `STRATA_CACHE_DIR_LISTING`: "true" or "false" (default: true)
    ///
    /// The result is not validated; coordinators validate on construction.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_size: std::env::var("STRATA_CACHE_MAX_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_size),
            ttl: std::env::var("STRATA_CACHE_TTL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.ttl),
            cache_exists: std::env::var("STRATA_CACHE_EXISTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.cache_exists),
            cache_dir_listing: std::env::var("STRATA_CACHE_DIR_LISTING")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.cache_dir_listing),
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.max_size, 100);
        assert_eq!(config.ttl, Duration::from_secs(300));
        assert!(config.cache_exists);
        assert!(config.cache_dir_listing);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = CacheConfig::new()
            .with_max_size(2)
            .with_ttl(Duration::from_millis(10))
            .with_cache_exists(false)
            .with_cache_dir_listing(false);

        assert_eq!(config.max_size, 2);
        assert_eq!(config.ttl, Duration::from_millis(10));
        assert!(!config.cache_exists);
        assert!(!config.cache_dir_listing);
    }

    #[test]
    fn test_validate_rejects_zero_max_size() {
        let err = CacheConfig::new().with_max_size(0).validate().unwrap_err();
        match err {
            StrataError::Config(ConfigError::InvalidValue { field, .. }) => {
                assert_eq!(field, "max_size")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let err = CacheConfig::new()
            .with_ttl(Duration::ZERO)
            .validate()
            .unwrap_err();
        match err {
            StrataError::Config(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "ttl"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_json_uses_milliseconds() {
        let config = CacheConfig::new().with_ttl(Duration::from_millis(1500));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["ttl_ms"], 1500);

        let back: CacheConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_sub_millisecond_ttl_rejected() {
        let config = CacheConfig::new().with_ttl(Duration::from_micros(500));
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            StrataError::Config(ConfigError::InvalidValue { ref field, .. }) if field == "ttl"
        ));

        let shortest = CacheConfig::new().with_ttl(MIN_TTL);
        shortest.validate().unwrap();
        let back: CacheConfig =
            serde_json::from_value(serde_json::to_value(&shortest).unwrap()).unwrap();
        assert_eq!(back, shortest);
        assert!(back.validate().is_ok());
    }

    #[test]
    fn test_from_env_parses_and_falls_back() {
        const VARS: [&str; 4] = [
            "STRATA_CACHE_MAX_SIZE",
            "STRATA_CACHE_TTL_MS",
            "STRATA_CACHE_EXISTS",
            "STRATA_CACHE_DIR_LISTING",
        ];

        std::env::set_var("STRATA_CACHE_MAX_SIZE", "abc");
        std::env::set_var("STRATA_CACHE_TTL_MS", "2500");
        std::env::set_var("STRATA_CACHE_EXISTS", "yes");
        std::env::set_var("STRATA_CACHE_DIR_LISTING", "false");
        let config = CacheConfig::from_env();

        std::env::set_var("STRATA_CACHE_MAX_SIZE", "42");
        std::env::remove_var("STRATA_CACHE_TTL_MS");
        std::env::remove_var("STRATA_CACHE_DIR_LISTING");
        let partial = CacheConfig::from_env();

        for var in VARS {
            std::env::remove_var(var);
        }

        assert_eq!(config.max_size, DEFAULT_MAX_SIZE);
        assert_eq!(config.ttl, Duration::from_millis(2500));
        assert!(config.cache_exists);
        assert!(!config.cache_dir_listing);

        assert_eq!(partial.max_size, 42);
        assert_eq!(partial.ttl, DEFAULT_TTL);
        assert!(partial.cache_dir_listing);
    }
}
