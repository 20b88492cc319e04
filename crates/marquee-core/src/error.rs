use thiserror::Error;

/// Message returned for a blank or missing query text.
pub const QUERY_REQUIRED_MESSAGE: &str = "Query can not be null!";

/// Message returned when the primary provider finds nothing.
pub const NO_RESULTS_MESSAGE: &str = "There is no video result!";

/// Message returned when a run is cancelled before it completes.
pub const CANCELLED_MESSAGE: &str = "The request was cancelled.";

/// Application-wide error types for Marquee.
#[derive(Error, Debug)]
pub enum AppError {
    /// Query text was blank or absent.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The primary provider returned zero candidates.
    #[error("There is no video result!")]
    NoResults,

    /// A provider kept failing past the retry budget, or failed in a way
    /// that carries no useful detail for the caller.
    #[error("An error occurred while trying to access the '{provider}' service.")]
    ProviderUnavailable { provider: String },

    /// A provider refused the request (authorization, quota). Never retried.
    #[error("{message}")]
    ProviderRejected { provider: String, message: String },

    /// Raw fault reported by a remote provider, before classification.
    #[error("{provider} fault{}: {message}", fmt_status(.status))]
    ProviderFault {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Cache read or write failed.
    #[error("Cache error: {0}")]
    CacheError(String),

    /// The caller cancelled the operation.
    #[error("The request was cancelled.")]
    Cancelled,

    /// A precondition on an argument was violated.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Missing or malformed configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl AppError {
    /// HTTP status carried by a raw provider fault, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            AppError::ProviderFault { status, .. } => *status,
            _ => None,
        }
    }

    /// The text placed into an aggregate's messages for this error.
    ///
    /// Raw transport faults collapse to a generic message so provider
    /// internals never reach the caller.
    pub fn user_message(&self) -> String {
        match self {
            AppError::ValidationError(msg) => msg.clone(),
            AppError::NoResults
            | AppError::ProviderUnavailable { .. }
            | AppError::ProviderRejected { .. }
            | AppError::Cancelled => self.to_string(),
            AppError::ProviderFault { provider, .. } => AppError::ProviderUnavailable {
                provider: provider.clone(),
            }
            .to_string(),
            _ => "Error".to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, AppError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        assert_eq!(
            AppError::ValidationError(QUERY_REQUIRED_MESSAGE.into()).user_message(),
            "Query can not be null!"
        );
        assert_eq!(AppError::NoResults.user_message(), "There is no video result!");
        assert_eq!(
            AppError::ProviderUnavailable {
                provider: "Vimeo".into()
            }
            .user_message(),
            "An error occurred while trying to access the 'Vimeo' service."
        );
        assert_eq!(AppError::Cancelled.user_message(), CANCELLED_MESSAGE);
        assert_eq!(
            AppError::ProviderRejected {
                provider: "Youtube".into(),
                message: "Youtube Service has an error. Client Unauthorized!".into(),
            }
            .user_message(),
            "Youtube Service has an error. Client Unauthorized!"
        );
        assert_eq!(AppError::NoResults.to_string(), NO_RESULTS_MESSAGE);
    }

    #[test]
    fn test_raw_faults_are_not_leaked() {
        let fault = AppError::ProviderFault {
            provider: "Vimeo".into(),
            status: Some(500),
            message: "stack trace from upstream".into(),
        };
        assert!(fault.to_string().contains("HTTP 500"));
        assert!(!fault.user_message().contains("stack trace"));
        assert_eq!(fault.status_code(), Some(500));
        assert_eq!(AppError::NetworkError("reset".into()).user_message(), "Error");
    }

    #[test]
    fn test_fault_display_without_status() {
        let fault = AppError::ProviderFault {
            provider: "YouTube".into(),
            status: None,
            message: "boom".into(),
        };
        assert_eq!(fault.to_string(), "YouTube fault: boom");
    }
}
