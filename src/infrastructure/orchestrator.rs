use std::{
    sync::{Arc, atomic::AtomicBool},
    time::Duration,
};

use log::info;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::Mutex;

use crate::{
    CrawlReport, FetcherRetrier, FetcherThrottler, GraphQlPageFetcher, PageFetcher,
    PaginatedCrawler, PersisterRetrier, PostgresPersister, QuotaTracker, RepositoryCrawler,
    StdResult,
};

/// External configuration for one crawl run. This is the only place
/// credentials, connection parameters, and bounds enter the core.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// The GraphQL endpoint to crawl.
    pub graphql_endpoint: String,

    /// PostgreSQL connection string.
    pub database_url: String,

    /// The search filter submitted to the provider.
    pub search_filter: String,

    /// Total repositories to collect.
    pub target_repositories: u32,

    /// Repositories fetched per page.
    pub page_size: u16,

    /// Maximum attempts per page request.
    pub max_fetch_attempts: u32,

    /// Maximum attempts per page commit.
    pub max_persist_attempts: u32,

    /// Remaining-quota threshold below which requests pause.
    pub quota_low_water_mark: i32,
}

impl CrawlConfig {
    /// Sensible bounds for the given endpoint, database, filter, and target.
    pub fn new(
        graphql_endpoint: &str,
        database_url: &str,
        search_filter: &str,
        target_repositories: u32,
        page_size: u16,
    ) -> Self {
        Self {
            graphql_endpoint: graphql_endpoint.to_string(),
            database_url: database_url.to_string(),
            search_filter: search_filter.to_string(),
            target_repositories,
            page_size,
            max_fetch_attempts: 3,
            max_persist_attempts: 3,
            quota_low_water_mark: 100,
        }
    }
}

/// Wires the fetcher and persister stacks into one bounded crawl run and
/// guarantees the store connection is released on every exit path.
pub struct CrawlOrchestrator {
    config: CrawlConfig,
    stop: Arc<AtomicBool>,
}

impl CrawlOrchestrator {
    const FETCH_BASE_DELAY: Duration = Duration::from_secs(1);
    const PERSIST_BASE_DELAY: Duration = Duration::from_millis(500);

    /// Creates a new `CrawlOrchestrator` for the given configuration.
    pub fn new(config: CrawlConfig) -> Self {
        Self {
            config,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The cooperative stop flag, observed between pages.
    pub fn stop_signal(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Drives one crawl run to completion or abortion and returns its report.
    pub async fn run(&self) -> StdResult<CrawlReport> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(&self.config.database_url)
            .await?;
        let postgres_persister = PostgresPersister::new(pool.clone());
        postgres_persister.provision_schema().await?;

        let result = self.crawl_with(postgres_persister).await;
        pool.close().await;

        let report = result?;
        info!("{report}");

        Ok(report)
    }

    async fn crawl_with(&self, postgres_persister: PostgresPersister) -> StdResult<CrawlReport> {
        let quota_tracker = Arc::new(Mutex::new(QuotaTracker::default()));
        let fetcher: Arc<dyn PageFetcher> = Arc::new(FetcherRetrier::new(
            Arc::new(FetcherThrottler::new(
                Arc::new(GraphQlPageFetcher::try_new(&self.config.graphql_endpoint)?),
                quota_tracker,
                self.config.quota_low_water_mark,
            )),
            self.config.max_fetch_attempts,
            Self::FETCH_BASE_DELAY,
            FetcherRetrier::DEFAULT_RATE_LIMIT_DELAY,
        ));
        let persister = Arc::new(PersisterRetrier::new(
            Arc::new(postgres_persister),
            self.config.max_persist_attempts,
            Self::PERSIST_BASE_DELAY,
        ));
        let crawler = PaginatedCrawler::new(fetcher, persister, self.config.page_size)
            .with_stop_signal(self.stop.clone());

        crawler
            .crawl(&self.config.search_filter, self.config.target_repositories)
            .await
    }
}
