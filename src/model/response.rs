use super::{RateLimitSnapshot, Repository};

/// One page of repository search results with its continuation state.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RepositoryPage {
    /// Retrieved repositories and their metadata
    pub(crate) repositories: Vec<Repository>,

    /// Whether the provider reports more results after this page
    pub(crate) has_next_page: bool,

    /// The cursor of the last record in the page
    pub(crate) end_cursor: Option<String>,

    /// The API rate limit information, when the provider reports it
    pub(crate) rate_limit: Option<RateLimitSnapshot>,
}

impl RepositoryPage {
    /// Creates a new `RepositoryPage` instance.
    pub fn new(
        repositories: Vec<Repository>,
        has_next_page: bool,
        end_cursor: Option<String>,
        rate_limit: Option<RateLimitSnapshot>,
    ) -> Self {
        Self {
            repositories,
            has_next_page,
            end_cursor,
            rate_limit,
        }
    }

    /// Retrieves the list of repositories.
    pub fn repositories(&self) -> &[Repository] {
        &self.repositories
    }

    /// Whether the page carries no records.
    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }

    /// Whether the provider reports more results after this page.
    pub fn has_next_page(&self) -> bool {
        self.has_next_page
    }

    /// Retrieves the cursor of the last record in the page.
    pub fn end_cursor(&self) -> Option<&str> {
        self.end_cursor.as_deref()
    }

    /// Retrieves the API rate limit information, if reported.
    pub fn rate_limit(&self) -> Option<&RateLimitSnapshot> {
        self.rate_limit.as_ref()
    }
}
