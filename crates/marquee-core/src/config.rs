use std::time::Duration;

use crate::backoff::{Backoff, DEFAULT_MAX_DELAY, DEFAULT_MAX_RETRIES, RetryPolicy};
use crate::cache::{CacheConfig, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL};
use crate::error::AppError;
use crate::pipeline::EnrichmentMode;

/// Tunables shared by every aggregation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorConfig {
    pub cache_ttl: Duration,
    pub cache_capacity: u64,
    pub max_retries: u32,
    pub backoff_ceiling: Duration,
    pub enrichment_mode: EnrichmentMode,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_ceiling: DEFAULT_MAX_DELAY,
            enrichment_mode: EnrichmentMode::default(),
        }
    }
}

impl AggregatorConfig {
    /// Read configuration from environment variables.
    ///
    /// - `MARQUEE_CACHE_TTL_SECS` (optional, defaults to 7200)
    /// - `MARQUEE_CACHE_CAPACITY` (optional, defaults to 10000)
    /// - `MARQUEE_MAX_RETRIES` (optional, defaults to 3)
    /// - `MARQUEE_BACKOFF_CEILING_SECS` (optional, defaults to 1024)
    /// - `MARQUEE_ENRICHMENT_MODE` (optional, `sequential` or `concurrent`)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = Self::default();

        let cache_ttl = match parse_positive(&lookup, "MARQUEE_CACHE_TTL_SECS")? {
            Some(secs) => Duration::from_secs(secs),
            None => defaults.cache_ttl,
        };
        let cache_capacity =
            parse_positive(&lookup, "MARQUEE_CACHE_CAPACITY")?.unwrap_or(defaults.cache_capacity);
        let max_retries = match lookup("MARQUEE_MAX_RETRIES") {
            None => defaults.max_retries,
            Some(raw) => raw.parse().map_err(|_| {
                AppError::ConfigError(format!(
                    "Invalid MARQUEE_MAX_RETRIES '{raw}': must be a non-negative integer"
                ))
            })?,
        };
        let backoff_ceiling = match parse_positive(&lookup, "MARQUEE_BACKOFF_CEILING_SECS")? {
            Some(secs) => Duration::from_secs(secs),
            None => defaults.backoff_ceiling,
        };
        let enrichment_mode = match lookup("MARQUEE_ENRICHMENT_MODE") {
            None => defaults.enrichment_mode,
            Some(raw) => raw.parse().map_err(AppError::ConfigError)?,
        };

        Ok(Self {
            cache_ttl,
            cache_capacity,
            max_retries,
            backoff_ceiling,
            enrichment_mode,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Backoff::new(self.backoff_ceiling))
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig { ttl: self.cache_ttl }
    }
}

fn parse_positive(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<u64>, AppError> {
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    let parsed: u64 = raw.parse().map_err(|_| {
        AppError::ConfigError(format!("Invalid {name} '{raw}': must be a positive integer"))
    })?;
    if parsed == 0 {
        return Err(AppError::ConfigError(format!("{name} must be at least 1")));
    }
    Ok(Some(parsed))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<AggregatorConfig, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AggregatorConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config, AggregatorConfig::default());
        assert_eq!(config.cache_ttl, Duration::from_secs(7200));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.enrichment_mode, EnrichmentMode::Sequential);
    }

    #[test]
    fn reads_overrides() {
        let config = config(&[
            ("MARQUEE_CACHE_TTL_SECS", "60"),
            ("MARQUEE_CACHE_CAPACITY", "5"),
            ("MARQUEE_MAX_RETRIES", "0"),
            ("MARQUEE_BACKOFF_CEILING_SECS", "8"),
            ("MARQUEE_ENRICHMENT_MODE", "concurrent"),
        ])
        .unwrap();

        assert_eq!(config.cache_config().ttl, Duration::from_secs(60));
        assert_eq!(config.cache_capacity, 5);
        assert_eq!(config.retry_policy().max_retries, 0);
        assert_eq!(config.backoff_ceiling, Duration::from_secs(8));
        assert_eq!(config.enrichment_mode, EnrichmentMode::Concurrent);
    }

    #[test]
    fn rejects_malformed_values() {
        for vars in [
            [("MARQUEE_CACHE_TTL_SECS", "0")],
            [("MARQUEE_CACHE_CAPACITY", "lots")],
            [("MARQUEE_MAX_RETRIES", "-1")],
            [("MARQUEE_ENRICHMENT_MODE", "parallel")],
        ] {
            let err = config(&vars).unwrap_err();
            assert!(matches!(err, AppError::ConfigError(_)), "{vars:?}");
        }
    }
}
