use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use anyhow::anyhow;
use log::{debug, info, warn};

use crate::{
    AbortReason, CrawlReport, CrawlRun, PageFetcher, RepositoryCrawler, RepositoryPersister,
    SearchPageRequest, StdResult,
};

/// Drives one cursor stream through fetch-then-commit cycles until the
/// record target is reached or the results are exhausted.
///
/// Retry backoff lives inside the fetcher and persister decorators, so the
/// driver only ever observes terminal results: a page, or a failure that
/// ends the run. Committed pages are never rolled back; an aborted run
/// reports the records already committed.
pub struct PaginatedCrawler {
    fetcher: Arc<dyn PageFetcher>,
    persister: Arc<dyn RepositoryPersister>,
    page_size: u16,
    progress_interval: u32,
    stop: Arc<AtomicBool>,
}

impl PaginatedCrawler {
    /// How many collected records between progress log lines.
    pub const DEFAULT_PROGRESS_INTERVAL: u32 = 1000;

    /// Creates a new `PaginatedCrawler` with the given fetcher and persister.
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        persister: Arc<dyn RepositoryPersister>,
        page_size: u16,
    ) -> Self {
        Self {
            fetcher,
            persister,
            page_size,
            progress_interval: Self::DEFAULT_PROGRESS_INTERVAL,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Installs a cooperative stop flag, checked between pages only.
    pub fn with_stop_signal(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Overrides the progress reporting cadence.
    pub fn with_progress_interval(mut self, progress_interval: u32) -> Self {
        self.progress_interval = progress_interval.max(1);
        self
    }

    fn log_progress(&self, collected_before: u32, run: &CrawlRun) {
        if collected_before / self.progress_interval != run.collected() / self.progress_interval {
            info!("Crawled {} repositories", run.collected());
        }
    }
}

#[async_trait::async_trait]
impl RepositoryCrawler for PaginatedCrawler {
    async fn crawl(&self, search_filter: &str, target: u32) -> StdResult<CrawlReport> {
        if search_filter.trim().is_empty() {
            return Err(anyhow!("A non-empty search filter is required"));
        }

        let mut run = CrawlRun::new(target);
        loop {
            if self.stop.load(Ordering::Relaxed) {
                info!("Stop signal received, ending crawl after the last committed page");
                return Ok(run.abort(AbortReason::Cancelled));
            }

            run.begin_request();
            let request = SearchPageRequest::new(
                search_filter,
                self.page_size,
                run.cursor().map(str::to_string),
            );
            debug!("Requesting page: {request}");
            let page = match self.fetcher.fetch_page(&request).await {
                Ok(page) => page,
                Err(error) => {
                    warn!("Fetch failed, ending crawl: {error}");
                    return Ok(run.abort(AbortReason::Fetch(error)));
                }
            };

            // An empty page ends the run even when the provider claims more
            // results; looping on it would never advance the cursor.
            if page.is_empty() {
                info!("Received an empty page, ending crawl");
                return Ok(run.finish());
            }

            run.begin_commit();
            let total_inserted = match self.persister.persist(page.repositories()).await {
                Ok(total_inserted) => total_inserted,
                Err(error) => {
                    warn!("Page commit failed, ending crawl: {error}");
                    return Ok(run.abort(AbortReason::Storage(error.to_string())));
                }
            };

            let total_fetched = page.repositories().len() as u32;
            let collected_before = run.collected();
            run.record_page(
                total_fetched,
                total_inserted,
                page.end_cursor().map(str::to_string),
            );
            self.log_progress(collected_before, &run);
            if let Some(rate_limit) = page.rate_limit() {
                debug!("Committed page of {total_fetched}, {rate_limit}");
            }

            if run.has_reached_target() || !page.has_next_page() {
                return Ok(run.finish());
            }
        }
    }
}
