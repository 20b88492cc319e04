pub mod backoff;
pub mod cache;
pub mod config;
pub mod error;
pub mod key;
pub mod models;
pub mod pipeline;
pub mod primary;
pub mod secondary;
pub mod traits;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use backoff::{Backoff, FaultClass, RetryError, RetryPolicy};
pub use cache::{CacheAsideStore, CacheBackend, CacheConfig, MokaCacheBackend, NullCache};
pub use config::AggregatorConfig;
pub use error::AppError;
pub use key::CacheKey;
pub use models::{
    AdapterResult, AggregateResult, Candidate, CandidatePage, EnrichedItem, ErrorDescriptor, Query,
};
pub use pipeline::{AggregationPipeline, EnrichmentMode, PipelineBuilder, Stage};
pub use primary::PrimarySearchAdapter;
pub use secondary::SecondaryAdapter;
pub use traits::{CandidateSource, PrimaryProvider, SearchRequest, SecondaryProvider, UrlSource};
