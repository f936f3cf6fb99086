use std::sync::Arc;

use chrono::Utc;
use log::warn;
use tokio::{sync::Mutex, time::sleep};

use crate::{
    FetchError, PageFetcher, QuotaTracker, RepositoryPage, SearchPageRequest,
};

/// Gates fetcher requests on the tracked request quota.
///
/// Before delegating, the throttler pauses until the quota reset when the
/// remaining budget is below the low-water mark; after each response it
/// feeds the provider-reported quota back into the tracker.
pub struct FetcherThrottler {
    /// The fetcher to be throttled.
    fetcher: Arc<dyn PageFetcher>,

    /// The quota state shared with the owning crawl run.
    tracker: Arc<Mutex<QuotaTracker>>,

    /// The remaining-budget threshold below which requests pause.
    low_water_mark: i32,
}

impl FetcherThrottler {
    /// Creates a new `FetcherThrottler` around the given fetcher.
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        tracker: Arc<Mutex<QuotaTracker>>,
        low_water_mark: i32,
    ) -> Self {
        Self {
            fetcher,
            tracker,
            low_water_mark,
        }
    }
}

#[async_trait::async_trait]
impl PageFetcher for FetcherThrottler {
    async fn fetch_page(
        &self,
        request: &SearchPageRequest,
    ) -> Result<RepositoryPage, FetchError> {
        let wait = {
            let tracker = self.tracker.lock().await;
            if tracker.should_throttle(self.low_water_mark) {
                tracker.wait_duration(Utc::now())
            } else {
                std::time::Duration::ZERO
            }
        };
        if !wait.is_zero() {
            warn!("Request budget low, waiting {wait:?} for the quota reset");
            sleep(wait).await;
        }

        let page = self.fetcher.fetch_page(request).await?;
        if let Some(rate_limit) = page.rate_limit() {
            self.tracker.lock().await.observe_snapshot(rate_limit);
        }

        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::{MockPageFetcher, RateLimitSnapshot, RepositoryPage};

    use super::*;

    fn page_with_rate_limit(remaining: i32) -> RepositoryPage {
        let mut rate_limit = RateLimitSnapshot::dummy();
        rate_limit.remaining = remaining;
        rate_limit.reset_at = Utc::now() + chrono::Duration::minutes(10);
        RepositoryPage::new(vec![], false, None, Some(rate_limit))
    }

    fn fetcher_returning(remaining: i32) -> MockPageFetcher {
        let mut fetcher = MockPageFetcher::new();
        fetcher
            .expect_fetch_page()
            .returning(move |_| Ok(page_with_rate_limit(remaining)))
            .times(1);

        fetcher
    }

    #[tokio::test]
    async fn does_not_throttle_with_budget_above_low_water_mark() {
        let tracker = Arc::new(Mutex::new(QuotaTracker::new(Duration::ZERO)));
        tracker
            .lock()
            .await
            .observe(4999, Utc::now() + chrono::Duration::minutes(10));
        let throttler = FetcherThrottler::new(Arc::new(fetcher_returning(4998)), tracker, 100);
        let started = std::time::Instant::now();

        throttler
            .fetch_page(&SearchPageRequest::dummy())
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn suspends_at_least_wait_duration_when_throttled() {
        let tracker = Arc::new(Mutex::new(QuotaTracker::new(Duration::ZERO)));
        tracker
            .lock()
            .await
            .observe(0, Utc::now() + chrono::Duration::milliseconds(200));
        let throttler = FetcherThrottler::new(Arc::new(fetcher_returning(5000)), tracker, 100);
        let started = std::time::Instant::now();

        throttler
            .fetch_page(&SearchPageRequest::dummy())
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn observes_rate_limit_from_each_response() {
        let tracker = Arc::new(Mutex::new(QuotaTracker::new(Duration::ZERO)));
        let throttler =
            FetcherThrottler::new(Arc::new(fetcher_returning(3)), tracker.clone(), 100);

        throttler
            .fetch_page(&SearchPageRequest::dummy())
            .await
            .unwrap();

        assert!(tracker.lock().await.should_throttle(100));
    }

    #[tokio::test]
    async fn never_throttles_when_provider_reports_no_quota() {
        let fetcher = {
            let mut fetcher = MockPageFetcher::new();
            fetcher
                .expect_fetch_page()
                .returning(|_| Ok(RepositoryPage::new(vec![], false, None, None)))
                .times(2);

            fetcher
        };
        let tracker = Arc::new(Mutex::new(QuotaTracker::new(Duration::ZERO)));
        let throttler = FetcherThrottler::new(Arc::new(fetcher), tracker.clone(), 100);

        throttler
            .fetch_page(&SearchPageRequest::dummy())
            .await
            .unwrap();
        throttler
            .fetch_page(&SearchPageRequest::dummy())
            .await
            .unwrap();

        assert!(!tracker.lock().await.should_throttle(100));
    }
}
