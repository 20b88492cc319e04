use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::backoff::{RetryError, RetryPolicy};
use crate::error::{AppError, QUERY_REQUIRED_MESSAGE};
use crate::models::{AdapterResult, ErrorDescriptor};
use crate::traits::{SecondaryProvider, UrlSource};

/// Calls one secondary provider with retry for a single candidate name.
#[derive(Clone)]
pub struct SecondaryAdapter<S> {
    provider: S,
    policy: RetryPolicy,
}

impl<S: SecondaryProvider> SecondaryAdapter<S> {
    pub fn new(provider: S, policy: RetryPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn provider(&self) -> &S {
        &self.provider
    }

    /// Look up supplementary URLs for `name`.
    ///
    /// Rejected faults (authorization, quota) map straight to the
    /// provider's descriptive message without consuming a retry.
    pub async fn search(&self, name: &str, cancel: &CancellationToken) -> AdapterResult<Vec<String>> {
        let provider = self.provider.name();

        if name.trim().is_empty() {
            tracing::error!(%provider, "Candidate name can not be null");
            return AdapterResult::failure(ErrorDescriptor::new(QUERY_REQUIRED_MESSAGE));
        }

        tracing::debug!(%provider, %name, "Searching secondary provider");

        let outcome = self
            .policy
            .run(
                provider,
                cancel,
                |e| self.provider.classify(e),
                || self.provider.search(name),
            )
            .await;

        match outcome {
            Ok(urls) => {
                tracing::debug!(%provider, %name, found = urls.len(), "Secondary provider call finished");
                AdapterResult::ok(urls)
            }
            Err(RetryError::Cancelled) => {
                AdapterResult::failure(ErrorDescriptor::from(&AppError::Cancelled))
            }
            Err(RetryError::Rejected { message, source }) => {
                tracing::error!(%provider, %name, error = %source, "Secondary provider rejected the request");
                AdapterResult::failure(ErrorDescriptor::from(&AppError::ProviderRejected {
                    provider: provider.to_string(),
                    message,
                }))
            }
            Err(e) => {
                tracing::error!(%provider, %name, error = %e, "Secondary provider search failed");
                AdapterResult::failure(ErrorDescriptor::from(&AppError::ProviderUnavailable {
                    provider: provider.to_string(),
                }))
            }
        }
    }
}

impl<S: SecondaryProvider + 'static> UrlSource for SecondaryAdapter<S> {
    fn name(&self) -> &str {
        self.provider.name()
    }

    fn find_urls<'a>(
        &'a self,
        name: &'a str,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, AdapterResult<Vec<String>>> {
        Box::pin(self.search(name, cancel))
    }
}
