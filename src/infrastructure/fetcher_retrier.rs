use std::{sync::Arc, time::Duration};

use log::warn;
use tokio::time::sleep;

use crate::{FetchError, PageFetcher, RepositoryPage, SearchPageRequest};

/// Retries a `PageFetcher` a bounded number of times on retryable failures.
///
/// Transport failures back off exponentially; rate-limit failures sleep a
/// fixed reactive delay independent of the quota tracker, covering limits
/// the tracker did not foresee. Fatal failures are surfaced immediately.
pub struct FetcherRetrier {
    /// The fetcher to be retried.
    fetcher: Arc<dyn PageFetcher>,

    /// The maximum number of attempts for a request.
    max_attempts: u32,

    /// The base delay for exponential backoff.
    base_delay: Duration,

    /// The fixed delay applied after a rate-limit classification.
    rate_limit_delay: Duration,
}

impl FetcherRetrier {
    /// The reactive pause after the provider reports a rate limit.
    pub const DEFAULT_RATE_LIMIT_DELAY: Duration = Duration::from_secs(60);

    /// Creates a new `FetcherRetrier` with the given bounds.
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        max_attempts: u32,
        base_delay: Duration,
        rate_limit_delay: Duration,
    ) -> Self {
        Self {
            fetcher,
            max_attempts,
            base_delay,
            rate_limit_delay,
        }
    }

    fn calculate_exponential_backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay * (2u32.pow(attempt.min(31)))
    }

    fn backoff_delay(&self, error: &FetchError, attempt: u32) -> Duration {
        match error {
            FetchError::RateLimited(_) => self.rate_limit_delay,
            _ => self.calculate_exponential_backoff_delay(attempt),
        }
    }
}

#[async_trait::async_trait]
impl PageFetcher for FetcherRetrier {
    /// Retries the request on retryable failures, up to the maximum number
    /// of attempts.
    async fn fetch_page(
        &self,
        request: &SearchPageRequest,
    ) -> Result<RepositoryPage, FetchError> {
        let mut attempts = 0;

        loop {
            match self.fetcher.fetch_page(request).await {
                Ok(page) => return Ok(page),
                Err(error) if !error.is_retryable() => return Err(error),
                Err(error) => {
                    attempts += 1;
                    warn!("Fetch attempt #{attempts} failed: {error}");
                    if attempts >= self.max_attempts {
                        return Err(FetchError::RetriesExhausted {
                            attempts,
                            last_error: error.to_string(),
                        });
                    }
                    sleep(self.backoff_delay(&error, attempts)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{MockPageFetcher, RateLimitSnapshot, Repository, RepositoryPage};

    use super::*;

    fn single_repository_page() -> RepositoryPage {
        RepositoryPage::new(
            vec![Repository::new(
                "R_001",
                "org-1/repository-1",
                10,
                "2020-05-01T10:00:00Z".parse().unwrap(),
            )],
            false,
            Some("cursor-1".to_string()),
            Some(RateLimitSnapshot::dummy()),
        )
    }

    fn retrier_with_short_delays(fetcher: MockPageFetcher, max_attempts: u32) -> FetcherRetrier {
        FetcherRetrier::new(
            Arc::new(fetcher),
            max_attempts,
            Duration::from_millis(10),
            Duration::from_millis(10),
        )
    }

    #[tokio::test]
    async fn fetch_success_on_first_attempt() {
        let fetcher = {
            let mut fetcher = MockPageFetcher::new();
            fetcher
                .expect_fetch_page()
                .returning(|_| Ok(single_repository_page()))
                .times(1);

            fetcher
        };
        let retrier = retrier_with_short_delays(fetcher, 3);

        retrier
            .fetch_page(&SearchPageRequest::dummy())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn fetch_success_after_retryable_failures() {
        let fetcher = {
            let mut fetcher = MockPageFetcher::new();
            fetcher
                .expect_fetch_page()
                .returning(|_| Err(FetchError::Transport("connection reset".to_string())))
                .times(2);
            fetcher
                .expect_fetch_page()
                .returning(|_| Ok(single_repository_page()))
                .times(1);

            fetcher
        };
        let retrier = retrier_with_short_delays(fetcher, 3);

        retrier
            .fetch_page(&SearchPageRequest::dummy())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn fetch_performs_exactly_max_attempts_before_exhaustion() {
        let fetcher = {
            let mut fetcher = MockPageFetcher::new();
            fetcher
                .expect_fetch_page()
                .returning(|_| Err(FetchError::Transport("timeout".to_string())))
                .times(3);

            fetcher
        };
        let retrier = retrier_with_short_delays(fetcher, 3);

        let error = retrier
            .fetch_page(&SearchPageRequest::dummy())
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            FetchError::RetriesExhausted { attempts: 3, .. }
        ));
    }

    #[tokio::test]
    async fn fetch_does_not_retry_fatal_failures() {
        let fetcher = {
            let mut fetcher = MockPageFetcher::new();
            fetcher
                .expect_fetch_page()
                .returning(|_| Err(FetchError::Fatal("bad credentials".to_string())))
                .times(1);

            fetcher
        };
        let retrier = retrier_with_short_delays(fetcher, 3);

        let error = retrier
            .fetch_page(&SearchPageRequest::dummy())
            .await
            .unwrap_err();

        assert!(matches!(error, FetchError::Fatal(_)));
    }

    #[tokio::test]
    async fn rate_limited_failure_waits_the_fixed_delay() {
        let fetcher = {
            let mut fetcher = MockPageFetcher::new();
            fetcher
                .expect_fetch_page()
                .returning(|_| Err(FetchError::RateLimited("rate limit exceeded".to_string())))
                .times(1);
            fetcher
                .expect_fetch_page()
                .returning(|_| Ok(single_repository_page()))
                .times(1);

            fetcher
        };
        let retrier = FetcherRetrier::new(
            Arc::new(fetcher),
            3,
            Duration::from_millis(1),
            Duration::from_millis(100),
        );
        let started = std::time::Instant::now();

        retrier
            .fetch_page(&SearchPageRequest::dummy())
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_millis(100));
    }
}
