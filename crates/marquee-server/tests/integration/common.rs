use std::sync::Arc;

use axum::Router;

use marquee_core::testutil::{MockPrimary, MockSecondary};
use marquee_core::{
    CacheAsideStore, CacheConfig, MokaCacheBackend, PipelineBuilder, PrimarySearchAdapter,
    RetryPolicy, SecondaryAdapter,
};
use marquee_server::routes;
use marquee_server::state::AppState;

pub struct TestApp {
    pub router: Router,
    pub backend: MokaCacheBackend,
}

/// Build the router over mock providers and a fresh in-process cache.
pub fn setup_test_app(primary: &MockPrimary, secondary: &MockSecondary) -> TestApp {
    let backend = MokaCacheBackend::new(64);
    let pipeline = PipelineBuilder::new(PrimarySearchAdapter::new(
        primary.clone(),
        RetryPolicy::default(),
    ))
    .enricher(SecondaryAdapter::new(secondary.clone(), RetryPolicy::default()))
    .with_cache(CacheAsideStore::new(backend.clone(), CacheConfig::default()))
    .build();

    TestApp {
        router: routes::router(Arc::new(AppState { pipeline })),
        backend,
    }
}
