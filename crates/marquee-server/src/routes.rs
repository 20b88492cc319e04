use std::sync::Arc;

use axum::Router;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use tokio_util::sync::CancellationToken;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use marquee_core::error::AppError;

use crate::dto::{HealthResponse, SearchParams, SearchResponse};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Build the full router with all routes.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new().route("/api/v2/movie/search", get(search));

    let public = Router::new()
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    public.merge(api).with_state(state)
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Search the primary provider, enrich each hit, and return the aggregate.
///
/// Provider failures are reported in `messages` with a 200 status; only a
/// malformed query string is rejected with 400.
#[utoipa::path(
    get,
    path = "/api/v2/movie/search",
    params(SearchParams),
    responses(
        (status = 200, description = "Aggregated search result", body = SearchResponse),
        (status = 400, description = "Malformed query string", body = crate::dto::ErrorResponse),
    ),
    tag = "movie"
)]
pub async fn search(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params.map_err(|e| AppError::ValidationError(e.body_text()))?;
    let query = marquee_core::Query::from(params);

    // Fires if the client goes away and this future is dropped.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let aggregate = state.pipeline.search(&query, &cancel).await;

    Ok(axum::Json(SearchResponse::from(aggregate)))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy",
        enrichment_mode: state.pipeline.enrichment_mode().to_string(),
        enrichers: state
            .pipeline
            .enricher_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
    };

    axum::Json(response)
}
