//! Plumbing shared by the provider clients.

use std::time::Duration;

use marquee_core::error::AppError;
use reqwest::{Client, Response};
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = "Marquee/0.1 (Movie Search)";

pub(crate) fn build_client(timeout: Duration) -> Result<Client, AppError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::HttpError(e.to_string()))
}

/// Join `path` onto `base` and append `params` as an encoded query string.
pub(crate) fn endpoint(base: &str, path: &str, params: &[(&str, String)]) -> Result<Url, AppError> {
    let raw = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    let mut url = Url::parse(&raw)
        .map_err(|e| AppError::ConfigError(format!("Invalid provider URL '{raw}': {e}")))?;
    if !params.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
    }
    Ok(url)
}

/// Map a transport failure from `send()`.
pub(crate) fn send_error(e: reqwest::Error, timeout_secs: u64) -> AppError {
    if e.is_timeout() {
        AppError::Timeout(timeout_secs)
    } else if e.is_connect() {
        AppError::NetworkError(format!("Connection failed: {e}"))
    } else {
        AppError::HttpError(e.to_string())
    }
}

/// Turn a non-2xx response into a [`AppError::ProviderFault`], using
/// `extract` to pull a message out of the provider's error body.
pub(crate) async fn fault_from_response(
    provider: &str,
    response: Response,
    extract: impl Fn(&str) -> Option<String>,
) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = extract(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
    });

    AppError::ProviderFault {
        provider: provider.to_string(),
        status: Some(status.as_u16()),
        message,
    }
}
