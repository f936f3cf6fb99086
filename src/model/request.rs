use std::fmt::Display;

use serde::Serialize;

/// A request for one page of repository search results.
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Hash)]
pub struct SearchPageRequest {
    /// The search filter submitted to the provider (e.g. `stars:>0`).
    pub(crate) query: String,

    /// The number of repositories to return.
    pub(crate) first: u16,

    /// The cursor for pagination.
    pub(crate) after: Option<String>,
}

impl SearchPageRequest {
    /// Creates a new `SearchPageRequest` with the given filter, page size, and cursor.
    pub fn new(query: &str, first: u16, after: Option<String>) -> Self {
        Self {
            query: query.to_string(),
            first,
            after,
        }
    }

    /// Retrieves the cursor the request continues from.
    pub fn after(&self) -> Option<&str> {
        self.after.as_deref()
    }

    /// Creates a dummy `SearchPageRequest` for testing purposes.
    #[cfg(test)]
    pub(crate) fn dummy() -> Self {
        Self {
            query: "stars:>0".to_string(),
            first: 100,
            after: None,
        }
    }
}

impl Display for SearchPageRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SearchPageRequest: query={}, first={}, after={:?}",
            self.query, self.first, self.after
        )
    }
}
