use std::time::Duration;

use marquee_core::backoff::FaultClass;
use marquee_core::error::AppError;
use marquee_core::traits::SecondaryProvider;
use reqwest::Client;
use serde::Deserialize;

use crate::http::{self, DEFAULT_TIMEOUT};

pub const PROVIDER_NAME: &str = "Youtube";

pub const QUOTA_EXCEEDED_MESSAGE: &str = "Youtube Service has an error. Request exceeded!";
pub const UNAUTHORIZED_MESSAGE: &str = "Youtube Service has an error. Client Unauthorized!";
pub const UNEXPECTED_MESSAGE: &str = "Youtube Service has an unexpected error!";

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
const DEFAULT_MAX_RESULTS: u32 = 5;
const VIDEO_KIND: &str = "youtube#video";
const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// Connection settings for the YouTube Data API.
#[derive(Debug, Clone)]
pub struct YoutubeConfig {
    pub api_key: String,
    pub base_url: String,
    pub max_results: u32,
}

impl YoutubeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// Read configuration from environment variables.
    ///
    /// - `YOUTUBE_API_KEY` (required)
    /// - `YOUTUBE_BASE_URL` (optional)
    /// - `YOUTUBE_MAX_RESULTS` (optional, defaults to 5)
    pub fn from_env() -> Result<Self, AppError> {
        let api_key = std::env::var("YOUTUBE_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                AppError::ConfigError("YOUTUBE_API_KEY not set. Required for enrichment.".into())
            })?;

        Self::new(api_key).with_env_overrides()
    }

    /// Apply `YOUTUBE_BASE_URL` and `YOUTUBE_MAX_RESULTS` when set.
    pub fn with_env_overrides(mut self) -> Result<Self, AppError> {
        if let Ok(base_url) = std::env::var("YOUTUBE_BASE_URL") {
            self.base_url = base_url;
        }
        if let Ok(raw) = std::env::var("YOUTUBE_MAX_RESULTS") {
            self.max_results = match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(AppError::ConfigError(format!(
                        "Invalid YOUTUBE_MAX_RESULTS '{raw}': must be a positive integer"
                    )));
                }
            };
        }
        Ok(self)
    }
}

/// YouTube search returning watch URLs for the most viewed matches.
#[derive(Clone)]
pub struct YoutubeClient {
    client: Client,
    config: YoutubeConfig,
    timeout_secs: u64,
}

impl YoutubeClient {
    pub fn new(config: YoutubeConfig) -> Result<Self, AppError> {
        Self::with_timeout(config, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(config: YoutubeConfig, timeout: Duration) -> Result<Self, AppError> {
        Ok(Self {
            client: http::build_client(timeout)?,
            config,
            timeout_secs: timeout.as_secs(),
        })
    }
}

// ---- YouTube API types ----

#[derive(Deserialize)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct SearchResult {
    id: ResourceId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    kind: String,
    #[serde(default)]
    video_id: Option<String>,
}

#[derive(Deserialize)]
struct GoogleError {
    error: GoogleErrorDetail,
}

#[derive(Deserialize)]
struct GoogleErrorDetail {
    message: String,
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<GoogleError>(body)
        .ok()
        .map(|e| e.error.message)
}

fn watch_urls(response: SearchListResponse) -> Vec<String> {
    response
        .items
        .into_iter()
        .filter(|item| item.id.kind == VIDEO_KIND)
        .filter_map(|item| item.id.video_id)
        .map(|id| format!("{WATCH_URL}{id}"))
        .collect()
}

impl SecondaryProvider for YoutubeClient {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn search(&self, name: &str) -> Result<Vec<String>, AppError> {
        let params = [
            ("part", "snippet".to_string()),
            ("type", "video".to_string()),
            ("order", "viewCount".to_string()),
            ("maxResults", self.config.max_results.to_string()),
            ("q", name.to_string()),
            ("key", self.config.api_key.clone()),
        ];
        let url = http::endpoint(&self.config.base_url, "search", &params)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| http::send_error(e, self.timeout_secs))?;

        if !response.status().is_success() {
            return Err(http::fault_from_response(PROVIDER_NAME, response, error_message).await);
        }

        let body: SearchListResponse = response
            .json()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to parse YouTube response: {e}")))?;

        Ok(watch_urls(body))
    }

    fn classify(&self, error: &AppError) -> FaultClass {
        classify(error)
    }
}

fn classify(error: &AppError) -> FaultClass {
    match error.status_code() {
        Some(500 | 502) => FaultClass::Transient,
        Some(403) => FaultClass::Rejected(QUOTA_EXCEEDED_MESSAGE.to_string()),
        Some(401) => FaultClass::Rejected(UNAUTHORIZED_MESSAGE.to_string()),
        _ => FaultClass::Rejected(UNEXPECTED_MESSAGE.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use marquee_core::backoff::RetryPolicy;
    use marquee_core::secondary::SecondaryAdapter;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::stub::StubServer;

    fn fault(status: u16) -> AppError {
        AppError::ProviderFault {
            provider: PROVIDER_NAME.into(),
            status: Some(status),
            message: "denied".into(),
        }
    }

    #[test]
    fn test_watch_urls_keep_only_videos() {
        let body = r#"{
            "kind": "youtube#searchListResponse",
            "items": [
                { "id": { "kind": "youtube#video", "videoId": "dlnmQbPGuls" } },
                { "id": { "kind": "youtube#channel", "channelId": "UC123" } },
                { "id": { "kind": "youtube#video", "videoId": "loTIzXAS7v4" } }
            ]
        }"#;
        let urls = watch_urls(serde_json::from_str(body).unwrap());
        assert_eq!(
            urls,
            vec![
                "https://www.youtube.com/watch?v=dlnmQbPGuls",
                "https://www.youtube.com/watch?v=loTIzXAS7v4",
            ]
        );
    }

    #[test]
    fn test_no_items() {
        let urls = watch_urls(serde_json::from_str(r#"{"kind":"youtube#searchListResponse"}"#).unwrap());
        assert!(urls.is_empty());
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(&fault(500)), FaultClass::Transient);
        assert_eq!(classify(&fault(502)), FaultClass::Transient);
        assert_eq!(
            classify(&fault(403)),
            FaultClass::Rejected(QUOTA_EXCEEDED_MESSAGE.into())
        );
        assert_eq!(
            classify(&fault(401)),
            FaultClass::Rejected(UNAUTHORIZED_MESSAGE.into())
        );
        assert_eq!(
            classify(&fault(404)),
            FaultClass::Rejected(UNEXPECTED_MESSAGE.into())
        );
        assert_eq!(
            classify(&AppError::NetworkError("reset".into())),
            FaultClass::Rejected(UNEXPECTED_MESSAGE.into())
        );
    }

    #[test]
    fn test_error_message() {
        let body = r#"{"error":{"code":403,"message":"The request cannot be completed because you have exceeded your quota."}}"#;
        assert!(error_message(body).unwrap().contains("quota"));
    }

    const QUOTA_BODY: &str = r#"{"error":{"code":403,"message":"The request cannot be completed because you have exceeded your quota."}}"#;

    fn client_for(base_url: &str) -> YoutubeClient {
        let mut config = YoutubeConfig::new("api-key");
        config.base_url = base_url.to_string();
        config.max_results = 3;
        YoutubeClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_search_sends_expected_params() {
        let server = StubServer::start(
            200,
            r#"{"items":[{"id":{"kind":"youtube#video","videoId":"gVosTabd_9M"}}]}"#,
        )
        .await;
        let client = client_for(&server.base_url);

        let urls = client.search("The Truman Show").await.unwrap();
        assert_eq!(urls, vec!["https://www.youtube.com/watch?v=gVosTabd_9M"]);

        let seen = server.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].path_and_query,
            "/search?part=snippet&type=video&order=viewCount&maxResults=3&q=The+Truman+Show&key=api-key"
        );
    }

    #[tokio::test]
    async fn test_quota_exceeded_is_rejected() {
        let server = StubServer::start(403, QUOTA_BODY).await;
        let client = client_for(&server.base_url);

        let err = client.search("alien").await.unwrap_err();
        assert_eq!(err.status_code(), Some(403));
        assert!(err.to_string().contains("quota"));
        assert_eq!(
            client.classify(&err),
            FaultClass::Rejected(QUOTA_EXCEEDED_MESSAGE.into())
        );
    }

    #[tokio::test]
    async fn test_bad_gateway_is_transient() {
        let server = StubServer::start(502, "").await;
        let client = client_for(&server.base_url);

        let err = client.search("alien").await.unwrap_err();
        assert_eq!(err.status_code(), Some(502));
        assert_eq!(client.classify(&err), FaultClass::Transient);
    }

    #[tokio::test]
    async fn test_adapter_surfaces_rejection_without_retrying() {
        let server = StubServer::start(403, QUOTA_BODY).await;
        let adapter = SecondaryAdapter::new(client_for(&server.base_url), RetryPolicy::default());

        let result = adapter.search("alien", &CancellationToken::new()).await;

        assert!(result.data.is_none());
        assert_eq!(result.errors[0].message, QUOTA_EXCEEDED_MESSAGE);
        assert_eq!(server.requests().len(), 1);
    }
}
