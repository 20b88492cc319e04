use marquee_core::{
    AggregationPipeline, AggregatorConfig, AppError, CacheAsideStore, MokaCacheBackend,
    PipelineBuilder, PrimarySearchAdapter, SecondaryAdapter,
};

use crate::vimeo::{VimeoClient, VimeoConfig};
use crate::youtube::{YoutubeClient, YoutubeConfig};

/// Vimeo search enriched by YouTube, behind an in-process cache.
///
/// Without a YouTube config the pipeline returns Vimeo results with only
/// their own links.
pub fn movie_pipeline(
    config: &AggregatorConfig,
    vimeo: VimeoConfig,
    youtube: Option<YoutubeConfig>,
) -> Result<AggregationPipeline<MokaCacheBackend>, AppError> {
    let fields = vimeo.search_fields.clone();
    let primary =
        PrimarySearchAdapter::new(VimeoClient::new(vimeo)?, config.retry_policy()).with_fields(fields);

    let store = CacheAsideStore::new(
        MokaCacheBackend::new(config.cache_capacity),
        config.cache_config(),
    );

    let mut builder = PipelineBuilder::new(primary)
        .enrichment_mode(config.enrichment_mode)
        .with_cache(store);

    match youtube {
        Some(youtube) => {
            builder = builder.enricher(SecondaryAdapter::new(
                YoutubeClient::new(youtube)?,
                config.retry_policy(),
            ));
        }
        None => tracing::warn!("YouTube is not configured, results will not be enriched"),
    }

    Ok(builder.build())
}
