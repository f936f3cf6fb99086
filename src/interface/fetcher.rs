use crate::{FetchError, RepositoryPage, SearchPageRequest};

/// A trait for fetching one page of repository search results from the API.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PageFetcher: Sync + Send {
    /// Fetches a single page of repositories for the given request.
    async fn fetch_page(
        &self,
        request: &SearchPageRequest,
    ) -> Result<RepositoryPage, FetchError>;
}
