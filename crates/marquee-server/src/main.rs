use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use marquee_client::{VimeoConfig, YoutubeConfig, movie_pipeline};
use marquee_core::AggregatorConfig;
use marquee_server::routes;
use marquee_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("marquee=info".parse()?))
        .with_target(false)
        .init();

    let port = std::env::var("MARQUEE_SERVER_PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{port}");

    let config = AggregatorConfig::from_env()?;
    let vimeo = VimeoConfig::from_env().context("Vimeo is required to serve searches")?;
    let youtube = YoutubeConfig::from_env()
        .inspect_err(|e| tracing::warn!(error = %e, "Skipping YouTube enrichment"))
        .ok();

    let pipeline = movie_pipeline(&config, vimeo, youtube)?;
    tracing::info!(
        mode = %config.enrichment_mode,
        cache_ttl_secs = config.cache_ttl.as_secs(),
        max_retries = config.max_retries,
        "Pipeline ready"
    );

    let state = Arc::new(AppState { pipeline });

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("Starting server on {addr}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for CTRL+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
