use std::{sync::Arc, time::Duration};

use anyhow::anyhow;
use log::warn;
use tokio::time::sleep;

use crate::{Repository, RepositoryPersister, StdResult};

/// Retries a `RepositoryPersister` a bounded number of times with
/// exponential backoff. Each attempt re-applies the whole page, which is
/// safe because page application is idempotent.
pub struct PersisterRetrier {
    /// The persister to be retried.
    persister: Arc<dyn RepositoryPersister>,

    /// The maximum number of attempts for a page commit.
    max_attempts: u32,

    /// The base delay for exponential backoff.
    base_delay: Duration,
}

impl PersisterRetrier {
    /// Creates a new `PersisterRetrier` with the given bounds.
    pub fn new(
        persister: Arc<dyn RepositoryPersister>,
        max_attempts: u32,
        base_delay: Duration,
    ) -> Self {
        Self {
            persister,
            max_attempts,
            base_delay,
        }
    }

    fn calculate_exponential_backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay * (2u32.pow(attempt.min(31)))
    }
}

#[async_trait::async_trait]
impl RepositoryPersister for PersisterRetrier {
    /// Retries the page commit if it fails, up to the maximum number of attempts.
    async fn persist(&self, data: &[Repository]) -> StdResult<u32> {
        let mut attempts = 0;

        loop {
            match self.persister.persist(data).await {
                Ok(total_inserted) => return Ok(total_inserted),
                Err(error) => {
                    attempts += 1;
                    warn!("Page commit attempt #{attempts} failed: {error}");
                    if attempts >= self.max_attempts {
                        return Err(anyhow!("Failed after {attempts} attempts: {error}"));
                    }
                    sleep(self.calculate_exponential_backoff_delay(attempts)).await;
                }
            }
        }
    }
}
