use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::backoff::{RetryError, RetryPolicy};
use crate::error::{AppError, QUERY_REQUIRED_MESSAGE};
use crate::models::{AdapterResult, CandidatePage, ErrorDescriptor, Query};
use crate::traits::{CandidateSource, PrimaryProvider, SearchRequest};

/// Calls the primary provider with retry and translates its faults.
#[derive(Clone)]
pub struct PrimarySearchAdapter<P> {
    provider: P,
    policy: RetryPolicy,
    fields: Option<Vec<String>>,
}

impl<P: PrimaryProvider> PrimarySearchAdapter<P> {
    pub fn new(provider: P, policy: RetryPolicy) -> Self {
        Self {
            provider,
            policy,
            fields: None,
        }
    }

    /// Ask the provider for a subset of fields only. Empty masks are ignored.
    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = (!fields.is_empty()).then_some(fields);
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Search the primary provider.
    ///
    /// Blank text is rejected without a remote call. An empty page is
    /// reported as "no results" rather than an empty success.
    pub async fn search(
        &self,
        query: &Query,
        cancel: &CancellationToken,
    ) -> AdapterResult<CandidatePage> {
        let provider = self.provider.name();

        if query.is_blank() {
            tracing::error!(%provider, "Query can not be null");
            return AdapterResult::failure(ErrorDescriptor::new(QUERY_REQUIRED_MESSAGE));
        }

        let request = SearchRequest::from_query(query, self.fields.clone());
        tracing::info!(%provider, text = %request.text, page = ?request.page, per_page = ?request.per_page, "Calling primary provider");

        let outcome = self
            .policy
            .run(
                provider,
                cancel,
                |e| self.provider.classify(e),
                || self.provider.search(&request),
            )
            .await;

        match outcome {
            Ok(page) if page.candidates.is_empty() => {
                tracing::info!(%provider, "Primary provider returned no candidates");
                AdapterResult::failure(ErrorDescriptor::from(&AppError::NoResults))
            }
            Ok(page) => {
                tracing::info!(
                    %provider,
                    candidates = page.candidates.len(),
                    total = page.total,
                    "Primary provider call finished"
                );
                AdapterResult::ok(page)
            }
            Err(RetryError::Cancelled) => {
                AdapterResult::failure(ErrorDescriptor::from(&AppError::Cancelled))
            }
            Err(RetryError::Rejected { message, source }) => {
                tracing::error!(%provider, error = %source, "Primary provider rejected the request");
                AdapterResult::failure(ErrorDescriptor::from(&AppError::ProviderRejected {
                    provider: provider.to_string(),
                    message,
                }))
            }
            Err(e) => {
                tracing::error!(%provider, error = %e, "Primary provider search failed");
                AdapterResult::failure(ErrorDescriptor::from(&AppError::ProviderUnavailable {
                    provider: provider.to_string(),
                }))
            }
        }
    }
}

impl<P: PrimaryProvider + 'static> CandidateSource for PrimarySearchAdapter<P> {
    fn name(&self) -> &str {
        self.provider.name()
    }

    fn find_candidates<'a>(
        &'a self,
        query: &'a Query,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, AdapterResult<CandidatePage>> {
        Box::pin(self.search(query, cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{NO_RESULTS_MESSAGE, QUERY_REQUIRED_MESSAGE};
    use crate::testutil::*;

    fn adapter(provider: MockPrimary) -> PrimarySearchAdapter<MockPrimary> {
        PrimarySearchAdapter::new(provider, RetryPolicy::default())
    }

    #[tokio::test]
    async fn blank_query_makes_no_remote_call() {
        let provider = MockPrimary::with_page(make_page(3));
        let result = adapter(provider.clone())
            .search(&Query::new("   "), &CancellationToken::new())
            .await;

        assert!(!result.is_success());
        assert_eq!(result.errors[0].message, QUERY_REQUIRED_MESSAGE);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn returns_candidates_and_forwards_pagination() {
        let provider = MockPrimary::with_page(make_page(2));
        let adapter = adapter(provider.clone()).with_fields(vec!["uri".into(), "name".into()]);
        let query = Query::new("truman show").with_page(1).with_per_page(2);

        let result = adapter.search(&query, &CancellationToken::new()).await;

        assert!(result.is_success());
        assert_eq!(result.data.unwrap().candidates.len(), 2);
        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].page, Some(1));
        assert_eq!(requests[0].per_page, Some(2));
        assert_eq!(requests[0].fields.as_ref().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn empty_page_is_no_results() {
        let provider = MockPrimary::with_page(make_page(0));
        let result = adapter(provider)
            .search(&Query::new("i-am-not-exist"), &CancellationToken::new())
            .await;

        assert!(result.data.is_none());
        assert_eq!(result.errors[0].message, NO_RESULTS_MESSAGE);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_server_fault_is_attempted_four_times() {
        let provider = MockPrimary::with_responses(
            (0..10).map(|_| Err(internal_server_error("Vimeo"))).collect(),
        );
        let result = adapter(provider.clone())
            .search(&Query::new("truman show"), &CancellationToken::new())
            .await;

        assert_eq!(provider.call_count(), 4);
        assert_eq!(
            result.errors[0].message,
            "An error occurred while trying to access the 'mock-primary' service."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_one_server_fault() {
        let provider = MockPrimary::with_responses(vec![
            Err(internal_server_error("Vimeo")),
            Ok(make_page(1)),
        ]);
        let result = adapter(provider.clone())
            .search(&Query::new("truman show"), &CancellationToken::new())
            .await;

        assert!(result.is_success());
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn non_transient_fault_is_not_retried_and_not_leaked() {
        let provider = MockPrimary::with_error(AppError::ProviderFault {
            provider: "Vimeo".into(),
            status: Some(400),
            message: "secret upstream detail".into(),
        });
        let result = adapter(provider.clone())
            .search(&Query::new("truman show"), &CancellationToken::new())
            .await;

        assert_eq!(provider.call_count(), 1);
        assert!(!result.errors[0].message.contains("secret"));
    }
}
