use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Marquee API",
        version = "0.1.0",
        description = "Movie search aggregated from a primary video catalogue and supplementary URL sources."
    ),
    paths(crate::routes::search, crate::routes::health),
    components(schemas(
        crate::dto::SearchResponse,
        crate::dto::VideoItemResponse,
        crate::dto::VideoResponse,
        crate::dto::MessageResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "movie", description = "Aggregated movie search"),
        (name = "system", description = "Health and system status"),
    )
)]
pub struct ApiDoc;
