use std::time::Duration;

use marquee_core::backoff::FaultClass;
use marquee_core::error::AppError;
use marquee_core::models::{Candidate, CandidatePage};
use marquee_core::traits::{PrimaryProvider, SearchRequest};
use reqwest::Client;
use serde::Deserialize;

use crate::http::{self, DEFAULT_TIMEOUT};

pub const PROVIDER_NAME: &str = "Vimeo";

const DEFAULT_BASE_URL: &str = "https://api.vimeo.com";
const ACCEPT: &str = "application/vnd.vimeo.*+json;version=3.4";

/// Connection settings for the Vimeo API.
#[derive(Debug, Clone)]
pub struct VimeoConfig {
    pub access_token: String,
    pub base_url: String,
    /// Field mask sent with every search. Empty means all fields.
    pub search_fields: Vec<String>,
}

impl VimeoConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            search_fields: Vec::new(),
        }
    }

    /// Read configuration from environment variables.
    ///
    /// - `VIMEO_ACCESS_TOKEN` (required)
    /// - `VIMEO_BASE_URL` (optional, defaults to `https://api.vimeo.com`)
    /// - `VIMEO_SEARCH_FIELDS` (optional, comma-separated field mask)
    pub fn from_env() -> Result<Self, AppError> {
        let access_token = std::env::var("VIMEO_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                AppError::ConfigError("VIMEO_ACCESS_TOKEN not set. Required for searching.".into())
            })?;

        Ok(Self::new(access_token).with_env_overrides())
    }

    /// Apply `VIMEO_BASE_URL` and `VIMEO_SEARCH_FIELDS` when set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(base_url) = std::env::var("VIMEO_BASE_URL") {
            self.base_url = base_url;
        }
        if let Ok(fields) = std::env::var("VIMEO_SEARCH_FIELDS") {
            self.search_fields = parse_fields(&fields);
        }
        self
    }
}

fn parse_fields(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

/// Vimeo video search over the REST API.
#[derive(Clone)]
pub struct VimeoClient {
    client: Client,
    config: VimeoConfig,
    timeout_secs: u64,
}

impl VimeoClient {
    pub fn new(config: VimeoConfig) -> Result<Self, AppError> {
        Self::with_timeout(config, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(config: VimeoConfig, timeout: Duration) -> Result<Self, AppError> {
        Ok(Self {
            client: http::build_client(timeout)?,
            config,
            timeout_secs: timeout.as_secs(),
        })
    }

    pub fn config(&self) -> &VimeoConfig {
        &self.config
    }
}

// ---- Vimeo API types ----

#[derive(Deserialize)]
struct VideoList {
    #[serde(default)]
    total: u32,
    #[serde(default)]
    page: u32,
    #[serde(default)]
    per_page: u32,
    #[serde(default)]
    data: Vec<Video>,
}

#[derive(Deserialize)]
struct Video {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    duration: Option<u32>,
}

#[derive(Deserialize)]
struct VimeoError {
    error: String,
    #[serde(default)]
    developer_message: Option<String>,
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<VimeoError>(body)
        .ok()
        .map(|e| e.developer_message.unwrap_or(e.error))
}

/// Numeric id from a `/videos/{id}` URI, falling back to the link's last
/// path segment.
fn video_id(uri: Option<&str>, link: Option<&str>) -> Option<u64> {
    [uri, link]
        .into_iter()
        .flatten()
        .find_map(|s| s.trim_end_matches('/').rsplit('/').next()?.parse().ok())
}

fn into_page(list: VideoList) -> CandidatePage {
    let candidates: Vec<Candidate> = list
        .data
        .into_iter()
        .filter_map(|video| {
            let id = video_id(video.uri.as_deref(), video.link.as_deref());
            let link = video
                .link
                .or_else(|| id.map(|id| format!("https://vimeo.com/{id}")))?;
            Some(Candidate {
                id: id.unwrap_or_default(),
                uri: video.uri,
                name: video.name.unwrap_or_default(),
                link,
                description: video.description,
                duration: video.duration,
            })
        })
        .collect();

    CandidatePage {
        total: list.total,
        page: list.page,
        per_page: list.per_page,
        candidates,
    }
}

fn search_params(request: &SearchRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![("query", request.text.clone())];
    if let Some(page) = request.page {
        params.push(("page", page.to_string()));
    }
    if let Some(per_page) = request.per_page {
        params.push(("per_page", per_page.to_string()));
    }
    if let Some(fields) = &request.fields {
        params.push(("fields", fields.join(",")));
    }
    params
}

impl PrimaryProvider for VimeoClient {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn search(&self, request: &SearchRequest) -> Result<CandidatePage, AppError> {
        let url = http::endpoint(&self.config.base_url, "videos", &search_params(request))?;

        let response = self
            .client
            .get(url)
            .header("Authorization", format!("bearer {}", self.config.access_token))
            .header("Accept", ACCEPT)
            .send()
            .await
            .map_err(|e| http::send_error(e, self.timeout_secs))?;

        if !response.status().is_success() {
            return Err(http::fault_from_response(PROVIDER_NAME, response, error_message).await);
        }

        let list: VideoList = response
            .json()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to parse Vimeo response: {e}")))?;

        Ok(into_page(list))
    }

    fn classify(&self, error: &AppError) -> FaultClass {
        classify(error)
    }
}

/// Only internal server errors are worth another attempt; Vimeo reports
/// them either as a 500 or in the error text.
fn classify(error: &AppError) -> FaultClass {
    match error {
        AppError::ProviderFault {
            status: Some(500), ..
        } => FaultClass::Transient,
        AppError::ProviderFault { message, .. }
            if message.to_lowercase().contains("internal server error") =>
        {
            FaultClass::Transient
        }
        _ => FaultClass::Fatal,
    }
}
