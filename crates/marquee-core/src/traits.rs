use std::future::Future;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::backoff::FaultClass;
use crate::error::AppError;
use crate::models::{AdapterResult, CandidatePage, Query};

/// Parameters sent to the primary provider.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchRequest {
    pub text: String,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Restricts the fields the provider returns, when supported.
    pub fields: Option<Vec<String>>,
}

impl SearchRequest {
    pub fn from_query(query: &Query, fields: Option<Vec<String>>) -> Self {
        Self {
            text: query.text.clone(),
            page: query.page,
            per_page: query.per_page,
            fields,
        }
    }
}

/// Remote service that supplies the ranked candidate list for a query.
pub trait PrimaryProvider: Send + Sync + Clone {
    /// Display name used in logs and user-facing messages.
    fn name(&self) -> &str;

    fn search(
        &self,
        request: &SearchRequest,
    ) -> impl Future<Output = Result<CandidatePage, AppError>> + Send;

    /// Decide whether a fault from [`search`](Self::search) is worth retrying.
    fn classify(&self, error: &AppError) -> FaultClass {
        classify_server_fault(error)
    }
}

/// Remote service that supplies extra playback URLs for a candidate name.
pub trait SecondaryProvider: Send + Sync + Clone {
    fn name(&self) -> &str;

    fn search(&self, name: &str) -> impl Future<Output = Result<Vec<String>, AppError>> + Send;

    fn classify(&self, error: &AppError) -> FaultClass {
        classify_server_fault(error)
    }
}

/// Default classification: 5xx responses, dropped connections and
/// timeouts are transient; everything else is fatal.
pub fn classify_server_fault(error: &AppError) -> FaultClass {
    match error {
        AppError::ProviderFault {
            status: Some(status),
            ..
        } if *status >= 500 => FaultClass::Transient,
        AppError::NetworkError(_) | AppError::Timeout(_) => FaultClass::Transient,
        _ => FaultClass::Fatal,
    }
}

/// Pipeline-facing view of a primary adapter.
pub trait CandidateSource: Send + Sync {
    fn name(&self) -> &str;

    fn find_candidates<'a>(
        &'a self,
        query: &'a Query,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, AdapterResult<CandidatePage>>;
}

/// Pipeline-facing view of a secondary adapter.
///
/// Object safe so adapters over different providers can share one
/// registration list.
pub trait UrlSource: Send + Sync {
    fn name(&self) -> &str;

    fn find_urls<'a>(
        &'a self,
        name: &'a str,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, AdapterResult<Vec<String>>>;
}
