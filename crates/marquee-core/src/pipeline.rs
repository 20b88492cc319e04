//! The aggregation pipeline: one fixed, ordered list of stages run per
//! query.
//!
//! ```text
//! Validate -> CacheCheck -(hit)-> Return
//!                 |
//!               (miss)
//!                 v
//!          PrimarySearch -> SecondaryEnrich (x N sources) -> CacheStore -> Return
//! ```
//!
//! Stages share one [`SearchContext`]. Validation, primary failures and
//! cancellation end the run with a single message. Secondary failures
//! only append a message, so a partially enriched aggregate is still
//! cached and returned.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::cache::{CacheAsideStore, CacheBackend, NullCache};
use crate::error::{AppError, QUERY_REQUIRED_MESSAGE};
use crate::key::CacheKey;
use crate::models::{AggregateResult, EnrichedItem, ErrorDescriptor, Query};
use crate::traits::{CandidateSource, UrlSource};

/// How one secondary source is applied across the candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnrichmentMode {
    /// One call at a time, candidate by candidate. Safe for rate-limited
    /// provider tiers.
    #[default]
    Sequential,
    /// All of a source's calls in flight at once; results are applied in
    /// candidate order with the same cut-off at the first failure.
    Concurrent,
}

impl EnrichmentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrichmentMode::Sequential => "sequential",
            EnrichmentMode::Concurrent => "concurrent",
        }
    }
}

impl fmt::Display for EnrichmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EnrichmentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" => Ok(EnrichmentMode::Sequential),
            "concurrent" => Ok(EnrichmentMode::Concurrent),
            _ => Err(format!("Unknown enrichment mode: {s}")),
        }
    }
}

/// A pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    CacheCheck,
    PrimarySearch,
    SecondaryEnrich,
    CacheStore,
}

enum Flow {
    Continue,
    Return,
}

/// Per-run state handed from stage to stage.
struct SearchContext<'q> {
    query: &'q Query,
    key: CacheKey,
    aggregate: AggregateResult,
    cache_hit: bool,
}

/// Builds an [`AggregationPipeline`].
pub struct PipelineBuilder<B = NullCache> {
    primary: Arc<dyn CandidateSource>,
    enrichers: Vec<Arc<dyn UrlSource>>,
    cache: Option<CacheAsideStore<B>>,
    mode: EnrichmentMode,
}

impl PipelineBuilder<NullCache> {
    pub fn new(primary: impl CandidateSource + 'static) -> Self {
        Self {
            primary: Arc::new(primary),
            enrichers: Vec::new(),
            cache: None,
            mode: EnrichmentMode::default(),
        }
    }
}

impl<B: CacheBackend> PipelineBuilder<B> {
    /// Register a secondary source. Sources run in registration order.
    pub fn enricher(mut self, source: impl UrlSource + 'static) -> Self {
        self.enrichers.push(Arc::new(source));
        self
    }

    /// Put a cache-aside store in front of the remote stages.
    pub fn with_cache<C: CacheBackend>(self, store: CacheAsideStore<C>) -> PipelineBuilder<C> {
        PipelineBuilder {
            primary: self.primary,
            enrichers: self.enrichers,
            cache: Some(store),
            mode: self.mode,
        }
    }

    pub fn enrichment_mode(mut self, mode: EnrichmentMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn build(self) -> AggregationPipeline<B> {
        let cached = self.cache.is_some();
        let mut stages = vec![Stage::Validate];
        if cached {
            stages.push(Stage::CacheCheck);
        }
        stages.extend([Stage::PrimarySearch, Stage::SecondaryEnrich]);
        if cached {
            stages.push(Stage::CacheStore);
        }

        AggregationPipeline {
            stages,
            primary: self.primary,
            enrichers: self.enrichers,
            cache: self.cache,
            mode: self.mode,
        }
    }
}

/// Validates, looks up, searches, enriches and caches one query at a time.
#[derive(Clone)]
pub struct AggregationPipeline<B = NullCache> {
    stages: Vec<Stage>,
    primary: Arc<dyn CandidateSource>,
    enrichers: Vec<Arc<dyn UrlSource>>,
    cache: Option<CacheAsideStore<B>>,
    mode: EnrichmentMode,
}

impl<B: CacheBackend> AggregationPipeline<B> {
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn enrichment_mode(&self) -> EnrichmentMode {
        self.mode
    }

    /// Names of the registered secondary sources, in run order.
    pub fn enricher_names(&self) -> Vec<&str> {
        self.enrichers.iter().map(|e| e.name()).collect()
    }

    /// Run the pipeline for `query`.
    ///
    /// Never fails: every failure is reported through the returned
    /// aggregate's messages.
    pub async fn search(&self, query: &Query, cancel: &CancellationToken) -> AggregateResult {
        let key = CacheKey::from_query(query);
        let span = tracing::info_span!("aggregate", run_id = %Uuid::new_v4(), %key);

        async move {
            let mut ctx = SearchContext {
                query,
                key,
                aggregate: AggregateResult::default(),
                cache_hit: false,
            };

            for stage in &self.stages {
                match self.run_stage(*stage, &mut ctx, cancel).await {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Return) => break,
                    Err(e) => {
                        if e.is_cancelled() {
                            tracing::info!(?stage, "Search cancelled");
                        } else {
                            tracing::warn!(?stage, error = %e, "Search stopped");
                        }
                        return AggregateResult::failure(ErrorDescriptor::from(&e));
                    }
                }
            }

            tracing::info!(
                items = ctx.aggregate.items().len(),
                messages = ctx.aggregate.messages().len(),
                cache_hit = ctx.cache_hit,
                "Search finished"
            );
            ctx.aggregate
        }
        .instrument(span)
        .await
    }

    async fn run_stage(
        &self,
        stage: Stage,
        ctx: &mut SearchContext<'_>,
        cancel: &CancellationToken,
    ) -> Result<Flow, AppError> {
        match stage {
            Stage::Validate => validate(ctx.query).map(|()| Flow::Continue),
            Stage::CacheCheck => self.cache_check(ctx, cancel).await,
            Stage::PrimarySearch => self.primary_search(ctx, cancel).await,
            Stage::SecondaryEnrich => self.enrich(ctx, cancel).await,
            Stage::CacheStore => self.cache_store(ctx, cancel).await,
        }
    }

    async fn cache_check(
        &self,
        ctx: &mut SearchContext<'_>,
        cancel: &CancellationToken,
    ) -> Result<Flow, AppError> {
        let Some(cache) = &self.cache else {
            return Ok(Flow::Continue);
        };

        match cache.try_get(&ctx.key, cancel).await? {
            Some(hit) => {
                tracing::info!("Serving aggregate from cache");
                ctx.aggregate = hit;
                ctx.cache_hit = true;
                Ok(Flow::Return)
            }
            None => Ok(Flow::Continue),
        }
    }

    async fn primary_search(
        &self,
        ctx: &mut SearchContext<'_>,
        cancel: &CancellationToken,
    ) -> Result<Flow, AppError> {
        let result = self.primary.find_candidates(ctx.query, cancel).await;
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        match result.data {
            Some(page) if result.errors.is_empty() && !page.candidates.is_empty() => {
                ctx.aggregate = AggregateResult::from_page(page);
                Ok(Flow::Continue)
            }
            _ => {
                let error = result
                    .errors
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| ErrorDescriptor::from(&AppError::NoResults));
                ctx.aggregate = AggregateResult::failure(error);
                Ok(Flow::Return)
            }
        }
    }

    async fn enrich(
        &self,
        ctx: &mut SearchContext<'_>,
        cancel: &CancellationToken,
    ) -> Result<Flow, AppError> {
        tracing::info!(sources = self.enrichers.len(), mode = %self.mode, "Enriching candidates");

        for source in &self.enrichers {
            let Some(items) = ctx.aggregate.items.as_mut() else {
                break;
            };

            tracing::info!(source = source.name(), "Enrichment started");
            let failure = match self.mode {
                EnrichmentMode::Sequential => enrich_sequential(source.as_ref(), items, cancel).await,
                EnrichmentMode::Concurrent => enrich_concurrent(source.as_ref(), items, cancel).await,
            }?;

            if let Some(errors) = failure {
                tracing::warn!(source = source.name(), "Enrichment stopped early");
                ctx.aggregate.extend_messages(errors);
            } else {
                tracing::info!(source = source.name(), "Enrichment finished");
            }
        }

        Ok(Flow::Continue)
    }

    async fn cache_store(
        &self,
        ctx: &mut SearchContext<'_>,
        cancel: &CancellationToken,
    ) -> Result<Flow, AppError> {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        if let Some(cache) = &self.cache
            && !ctx.cache_hit
        {
            cache.put(&ctx.key, &ctx.aggregate, cancel).await;
        }

        Ok(Flow::Continue)
    }
}

fn validate(query: &Query) -> Result<(), AppError> {
    if query.is_blank() {
        return Err(AppError::ValidationError(QUERY_REQUIRED_MESSAGE.into()));
    }
    if query.page == Some(0) {
        return Err(AppError::ValidationError(
            "Page must be a positive integer!".into(),
        ));
    }
    if query.per_page == Some(0) {
        return Err(AppError::ValidationError(
            "PerPage must be a positive integer!".into(),
        ));
    }
    Ok(())
}

/// Apply one source to each item in turn. Returns the source's errors if
/// it failed, after which the remaining items are left untouched.
async fn enrich_sequential(
    source: &dyn UrlSource,
    items: &mut [EnrichedItem],
    cancel: &CancellationToken,
) -> Result<Option<Vec<ErrorDescriptor>>, AppError> {
    for item in items.iter_mut() {
        let result = source.find_urls(&item.candidate.name, cancel).await;
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        if !result.is_success() {
            return Ok(Some(result.errors));
        }
        if let Some(urls) = result.data {
            item.urls.extend(urls);
        }
    }
    Ok(None)
}

async fn enrich_concurrent(
    source: &dyn UrlSource,
    items: &mut [EnrichedItem],
    cancel: &CancellationToken,
) -> Result<Option<Vec<ErrorDescriptor>>, AppError> {
    let names: Vec<String> = items.iter().map(|i| i.candidate.name.clone()).collect();
    let results =
        futures::future::join_all(names.iter().map(|name| source.find_urls(name, cancel))).await;
    if cancel.is_cancelled() {
        return Err(AppError::Cancelled);
    }

    for (item, result) in items.iter_mut().zip(results) {
        if !result.is_success() {
            return Ok(Some(result.errors));
        }
        if let Some(urls) = result.data {
            item.urls.extend(urls);
        }
    }
    Ok(None)
}
