use thiserror::Error;

/// The standard result type used throughout the application.
pub type StdResult<T> = Result<T, anyhow::Error>;

/// A failure while fetching a page from the provider.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Network-level failure (timeout, connection reset), worth retrying.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The provider reported a rate limit, worth retrying after a pause.
    #[error("Provider rate limited: {0}")]
    RateLimited(String),

    /// The provider rejected the request (malformed query, bad credential).
    #[error("Provider fatal error: {0}")]
    Fatal(String),

    /// All retry attempts for a single request were consumed.
    #[error("Retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

impl FetchError {
    /// Whether a retrier may attempt the request again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transport(_) | FetchError::RateLimited(_))
    }
}
