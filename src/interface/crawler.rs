use crate::{CrawlReport, StdResult};

/// A trait for driving one bounded crawl of the repository search API.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RepositoryCrawler: Sync + Send {
    /// Crawls pages matching the search filter until the target record count
    /// is reached or the result stream ends. Failures past the retry bounds
    /// end the run as `Aborted` inside the report rather than as an error.
    async fn crawl(&self, search_filter: &str, target: u32) -> StdResult<CrawlReport>;
}
