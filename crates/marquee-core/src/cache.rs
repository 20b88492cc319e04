//! Cache-aside storage for finished aggregates.
//!
//! [`CacheAsideStore`] serializes [`AggregateResult`]s to JSON and keeps
//! them in any [`CacheBackend`] under a sliding TTL. Every backend fault is
//! absorbed here: a failed or poisoned read is a miss and a failed write is
//! a warning, so the cache can never fail a search.

use std::future::Future;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache;
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::key::CacheKey;
use crate::models::AggregateResult;

/// Default sliding expiration for cached aggregates.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Default entry capacity of the in-process backend.
pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

/// String key/value store with per-entry time-to-live.
pub trait CacheBackend: Send + Sync + Clone {
    fn get_string(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, AppError>> + Send;

    /// Store `value`; the entry expires after `ttl` without being read.
    fn set_string(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// A no-op backend: every read misses and every write is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCache;

impl CacheBackend for NullCache {
    async fn get_string(&self, _key: &str) -> Result<Option<String>, AppError> {
        Ok(None)
    }

    async fn set_string(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), AppError> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    ttl: Duration,
}

/// Resets an entry's lifetime on every write and every read.
struct SlidingExpiry;

impl Expiry<String, CacheEntry> for SlidingExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_read(
        &self,
        _key: &String,
        value: &CacheEntry,
        _read_at: Instant,
        _duration_until_expiry: Option<Duration>,
        _last_modified_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process backend built on moka with sliding per-entry expiration.
#[derive(Clone)]
pub struct MokaCacheBackend {
    cache: Cache<String, CacheEntry>,
}

impl MokaCacheBackend {
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(SlidingExpiry)
            .build();
        Self { cache }
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for MokaCacheBackend {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl CacheBackend for MokaCacheBackend {
    async fn get_string(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.cache.get(key).await.map(|entry| entry.value))
    }

    async fn set_string(&self, key: &str, value: String, ttl: Duration) -> Result<(), AppError> {
        self.cache
            .insert(key.to_string(), CacheEntry { value, ttl })
            .await;
        Ok(())
    }
}

/// Options for [`CacheAsideStore`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Sliding expiration applied to every stored aggregate.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CACHE_TTL,
        }
    }
}

/// Cache-aside front for aggregates.
#[derive(Clone)]
pub struct CacheAsideStore<B> {
    backend: B,
    config: CacheConfig,
}

impl<B: CacheBackend> CacheAsideStore<B> {
    pub fn new(backend: B, config: CacheConfig) -> Self {
        Self { backend, config }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    /// Look up a cached aggregate.
    ///
    /// Backend faults and undecodable entries are logged and reported as a
    /// miss. The only error is `AppError::Cancelled`.
    pub async fn try_get(
        &self,
        key: &CacheKey,
        cancel: &CancellationToken,
    ) -> Result<Option<AggregateResult>, AppError> {
        let raw = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AppError::Cancelled),
            raw = self.backend.get_string(key.as_str()) => raw,
        };

        let raw = match raw {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => {
                tracing::debug!(%key, "Cache miss");
                return Ok(None);
            }
            Err(e) => {
                tracing::warn!(%key, error = %e, "Cache read failed, treating as miss");
                return Ok(None);
            }
        };

        match serde_json::from_str::<AggregateResult>(&raw) {
            Ok(aggregate) => {
                tracing::debug!(%key, "Cache hit");
                Ok(Some(aggregate))
            }
            Err(e) => {
                tracing::warn!(%key, error = %e, "Cached entry is unreadable, treating as miss");
                Ok(None)
            }
        }
    }

    /// Store an aggregate, best effort.
    ///
    /// Serialization and backend faults are logged and dropped. A fired
    /// `cancel` abandons the write.
    pub async fn put(&self, key: &CacheKey, aggregate: &AggregateResult, cancel: &CancellationToken) {
        let raw = match serde_json::to_string(aggregate) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(%key, error = %e, "Failed to serialize aggregate for cache");
                return;
            }
        };

        let write = self.backend.set_string(key.as_str(), raw, self.config.ttl);
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(%key, "Cache write abandoned after cancellation");
                return;
            }
            result = write => result,
        };

        match result {
            Ok(()) => tracing::info!(%key, ttl_secs = self.config.ttl.as_secs(), "Aggregate cached"),
            Err(e) => tracing::warn!(%key, error = %e, "Cache write failed"),
        }
    }
}
