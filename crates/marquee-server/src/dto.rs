use serde::{Deserialize, Serialize};

use marquee_core::models::{AggregateResult, Candidate, EnrichedItem, ErrorDescriptor};

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Free-text search. A blank or missing value is reported in `messages`.
    #[serde(alias = "Query")]
    pub query: Option<String>,
    /// 1-based page number.
    #[serde(alias = "Page")]
    pub page: Option<u32>,
    #[serde(alias = "PerPage", alias = "per_page")]
    pub per_page: Option<u32>,
}

impl From<SearchParams> for marquee_core::Query {
    fn from(params: SearchParams) -> Self {
        let mut query = marquee_core::Query::new(params.query.unwrap_or_default());
        query.page = params.page;
        query.per_page = params.per_page;
        query
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoResponse {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    pub name: String,
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

impl From<Candidate> for VideoResponse {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id,
            uri: candidate.uri,
            name: candidate.name,
            link: candidate.link,
            description: candidate.description,
            duration: candidate.duration,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoItemResponse {
    pub video: VideoResponse,
    /// The video's own link first, then supplementary URLs in source order.
    pub video_urls: Vec<String>,
}

impl From<EnrichedItem> for VideoItemResponse {
    fn from(item: EnrichedItem) -> Self {
        Self {
            video: item.candidate.into(),
            video_urls: item.urls,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl From<&ErrorDescriptor> for MessageResponse {
    fn from(descriptor: &ErrorDescriptor) -> Self {
        Self {
            message: descriptor.message.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<VideoItemResponse>>,
    pub total_count: u32,
    pub per_page: u32,
    pub page: u32,
    pub messages: Vec<MessageResponse>,
    pub is_success: bool,
}

impl From<AggregateResult> for SearchResponse {
    fn from(aggregate: AggregateResult) -> Self {
        let messages = aggregate.messages().iter().map(MessageResponse::from).collect();
        let is_success = aggregate.is_success();
        Self {
            data: aggregate
                .items
                .map(|items| items.into_iter().map(VideoItemResponse::from).collect()),
            total_count: aggregate.total_count,
            per_page: aggregate.per_page,
            page: aggregate.page,
            messages,
            is_success,
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub enrichment_mode: String,
    /// Secondary sources, in the order they run.
    pub enrichers: Vec<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
