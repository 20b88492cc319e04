//! Test utilities: mock providers and cache backends.
//!
//! Handwritten mocks for dependency injection in unit and integration
//! tests. All mocks use `Arc<Mutex<_>>` so clones share state and tests can
//! assert on recorded calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::backoff::FaultClass;
use crate::cache::CacheBackend;
use crate::error::AppError;
use crate::models::{Candidate, CandidatePage};
use crate::traits::{PrimaryProvider, SearchRequest, SecondaryProvider, classify_server_fault};

/// Message [`MockSecondary`] reports for a rejected (403) call.
pub const MOCK_REJECTED_MESSAGE: &str = "Mock service has an error. Request exceeded!";

// ---------------------------------------------------------------------------
// MockPrimary
// ---------------------------------------------------------------------------

/// Mock primary provider.
#[derive(Clone)]
pub struct MockPrimary {
    name: String,
    /// Queue of responses. Each call pops the first element.
    /// If empty, returns a one-candidate page.
    responses: Arc<Mutex<Vec<Result<CandidatePage, AppError>>>>,
    requests: Arc<Mutex<Vec<SearchRequest>>>,
}

impl MockPrimary {
    pub fn with_page(page: CandidatePage) -> Self {
        Self::with_responses(vec![Ok(page)])
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<CandidatePage, AppError>>) -> Self {
        Self {
            name: "mock-primary".to_string(),
            responses: Arc::new(Mutex::new(responses)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl PrimaryProvider for MockPrimary {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, request: &SearchRequest) -> Result<CandidatePage, AppError> {
        self.requests.lock().unwrap().push(request.clone());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(make_page(1))
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockSecondary
// ---------------------------------------------------------------------------

/// Mock secondary provider.
///
/// Pops queued responses first, then answers every further call with the
/// fallback URL list. 403 faults classify as rejected with
/// [`MOCK_REJECTED_MESSAGE`].
#[derive(Clone)]
pub struct MockSecondary {
    name: String,
    responses: Arc<Mutex<Vec<Result<Vec<String>, AppError>>>>,
    fallback: Vec<String>,
    delay: Option<Duration>,
    names: Arc<Mutex<Vec<String>>>,
}

impl MockSecondary {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            responses: Arc::new(Mutex::new(Vec::new())),
            fallback: Vec::new(),
            delay: None,
            names: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answers every call with `urls`.
    pub fn with_urls(urls: &[&str]) -> Self {
        Self::named("mock-secondary").with_fallback(urls)
    }

    pub fn with_responses(responses: Vec<Result<Vec<String>, AppError>>) -> Self {
        Self::named("mock-secondary").with_queue(responses)
    }

    pub fn with_fallback(mut self, urls: &[&str]) -> Self {
        self.fallback = urls.iter().map(|u| u.to_string()).collect();
        self
    }

    pub fn with_queue(self, responses: Vec<Result<Vec<String>, AppError>>) -> Self {
        *self.responses.lock().unwrap() = responses;
        self
    }

    /// Every call sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.names.lock().unwrap().len()
    }

    /// Candidate names received, in call order.
    pub fn names(&self) -> Vec<String> {
        self.names.lock().unwrap().clone()
    }
}

impl SecondaryProvider for MockSecondary {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, name: &str) -> Result<Vec<String>, AppError> {
        self.names.lock().unwrap().push(name.to_string());
        let next = {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Ok(self.fallback.clone())
            } else {
                responses.remove(0)
            }
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        next
    }

    fn classify(&self, error: &AppError) -> FaultClass {
        match error {
            AppError::ProviderFault {
                status: Some(403), ..
            } => FaultClass::Rejected(MOCK_REJECTED_MESSAGE.to_string()),
            other => classify_server_fault(other),
        }
    }
}

// ---------------------------------------------------------------------------
// MockCache
// ---------------------------------------------------------------------------

/// A cache write as seen by the backend: key, JSON value, TTL.
pub type CacheWrite = (String, String, Duration);

/// Mock cache backend over a plain map. Records reads and writes.
#[derive(Clone)]
pub struct MockCache {
    entries: Arc<Mutex<HashMap<String, String>>>,
    writes: Arc<Mutex<Vec<CacheWrite>>>,
    gets: Arc<Mutex<usize>>,
    get_error: Arc<Mutex<Option<AppError>>>,
    set_error: Arc<Mutex<Option<AppError>>>,
}

impl MockCache {
    pub fn empty() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            writes: Arc::new(Mutex::new(Vec::new())),
            gets: Arc::new(Mutex::new(0)),
            get_error: Arc::new(Mutex::new(None)),
            set_error: Arc::new(Mutex::new(None)),
        }
    }

    /// The next read fails with `error`.
    pub fn with_get_error(error: AppError) -> Self {
        let cache = Self::empty();
        *cache.get_error.lock().unwrap() = Some(error);
        cache
    }

    /// The next write fails with `error`.
    pub fn with_set_error(error: AppError) -> Self {
        let cache = Self::empty();
        *cache.set_error.lock().unwrap() = Some(error);
        cache
    }

    /// Insert an entry without recording it as a write.
    pub fn seed(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn get_count(&self) -> usize {
        *self.gets.lock().unwrap()
    }

    /// Successful writes, in order.
    pub fn writes(&self) -> Vec<CacheWrite> {
        self.writes.lock().unwrap().clone()
    }
}

impl CacheBackend for MockCache {
    async fn get_string(&self, key: &str) -> Result<Option<String>, AppError> {
        *self.gets.lock().unwrap() += 1;
        if let Some(e) = self.get_error.lock().unwrap().take() {
            return Err(e);
        }
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set_string(&self, key: &str, value: String, ttl: Duration) -> Result<(), AppError> {
        if let Some(e) = self.set_error.lock().unwrap().take() {
            return Err(e);
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.clone());
        self.writes
            .lock()
            .unwrap()
            .push((key.to_string(), value, ttl));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A candidate whose link is its Vimeo page.
pub fn make_candidate(id: u64, name: &str) -> Candidate {
    Candidate {
        id,
        uri: Some(format!("/videos/{id}")),
        name: name.to_string(),
        link: format!("https://vimeo.com/{id}"),
        description: None,
        duration: Some(120),
    }
}

/// A first page holding `count` candidates named "Video 1", "Video 2", ...
pub fn make_page(count: u32) -> CandidatePage {
    CandidatePage {
        candidates: (1..=count)
            .map(|i| make_candidate(u64::from(i), &format!("Video {i}")))
            .collect(),
        total: count,
        page: 1,
        per_page: count.max(1),
    }
}

/// The fault a provider raises for an HTTP 500.
pub fn internal_server_error(provider: &str) -> AppError {
    AppError::ProviderFault {
        provider: provider.to_string(),
        status: Some(500),
        message: "Internal Server Error".to_string(),
    }
}

/// The fault a provider raises for an HTTP 403.
pub fn forbidden(provider: &str) -> AppError {
    AppError::ProviderFault {
        provider: provider.to_string(),
        status: Some(403),
        message: "Forbidden".to_string(),
    }
}
