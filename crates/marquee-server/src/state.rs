use marquee_core::{AggregationPipeline, MokaCacheBackend};

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub pipeline: AggregationPipeline<MokaCacheBackend>,
}
