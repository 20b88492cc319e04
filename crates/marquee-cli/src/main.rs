use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use marquee_client::{VimeoConfig, YoutubeConfig, movie_pipeline};
use marquee_core::{AggregatorConfig, Backoff, EnrichmentMode, Query};

#[derive(Parser)]
#[command(name = "marquee", version, about = "Movie search across Vimeo and YouTube")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search Vimeo and enrich every hit with YouTube links
    Search {
        /// Free-text query
        #[arg(short, long)]
        query: String,

        /// 1-based page number
        #[arg(short, long)]
        page: Option<u32>,

        /// Results per page
        #[arg(long)]
        per_page: Option<u32>,

        /// Vimeo access token
        #[arg(long, env = "VIMEO_ACCESS_TOKEN", hide_env_values = true)]
        vimeo_token: String,

        /// YouTube API key; without one, results are not enriched
        #[arg(long, env = "YOUTUBE_API_KEY", hide_env_values = true)]
        youtube_key: Option<String>,

        /// Override MARQUEE_ENRICHMENT_MODE (sequential or concurrent)
        #[arg(long)]
        mode: Option<EnrichmentMode>,
    },

    /// Print the retry backoff schedule
    Backoff {
        /// Number of retries to show
        #[arg(short, long, default_value_t = 6)]
        retries: i32,

        /// Delay ceiling in seconds
        #[arg(long, default_value_t = 1024)]
        ceiling: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("marquee=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Search {
            query,
            page,
            per_page,
            vimeo_token,
            youtube_key,
            mode,
        } => {
            let query = Query {
                text: query,
                page,
                per_page,
            };
            cmd_search(query, vimeo_token, youtube_key, mode).await?;
        }
        Commands::Backoff { retries, ceiling } => {
            cmd_backoff(retries, ceiling)?;
        }
    }

    Ok(())
}

async fn cmd_search(
    query: Query,
    vimeo_token: String,
    youtube_key: Option<String>,
    mode: Option<EnrichmentMode>,
) -> Result<()> {
    let mut config = AggregatorConfig::from_env().context("Invalid MARQUEE_* configuration")?;
    if let Some(mode) = mode {
        config.enrichment_mode = mode;
    }

    let vimeo = VimeoConfig::new(vimeo_token).with_env_overrides();
    let youtube = youtube_key
        .map(|key| YoutubeConfig::new(key).with_env_overrides())
        .transpose()?;

    let pipeline = movie_pipeline(&config, vimeo, youtube)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted, cancelling search...");
            on_interrupt.cancel();
        }
    });

    let aggregate = pipeline.search(&query, &cancel).await;
    println!("{}", serde_json::to_string_pretty(&aggregate)?);

    if !aggregate.is_success() {
        for message in aggregate.messages() {
            eprintln!("  {}", message.message);
        }
    }

    Ok(())
}

fn cmd_backoff(retries: i32, ceiling: u64) -> Result<()> {
    println!("{:<8} {:>12} {:>12}", "RETRY", "DELAY (s)", "TOTAL (s)");
    println!("{}", "-".repeat(34));
    for (retry, delay, total) in backoff_schedule(retries, ceiling)? {
        println!(
            "{:<8} {:>12.1} {:>12.1}",
            retry,
            delay.as_secs_f64(),
            total.as_secs_f64()
        );
    }

    Ok(())
}

/// `(retry, delay, cumulative wait)` rows for retries `1..=retries`.
fn backoff_schedule(retries: i32, ceiling: u64) -> Result<Vec<(i32, Duration, Duration)>> {
    let backoff = Backoff::new(Duration::from_secs(ceiling));
    let mut total = Duration::ZERO;
    let mut rows = Vec::new();

    for retry in 1..=retries {
        let delay = backoff.delay_for_attempt(retry)?;
        total = total.saturating_add(delay);
        rows.push((retry, delay, total));
    }

    Ok(rows)
}
