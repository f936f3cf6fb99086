mod crawler_paginated;
mod exporter_csv;
mod fetcher_graphql;
mod fetcher_retrier;
mod fetcher_throttler;
mod orchestrator;
mod persister_postgresql;
mod persister_retrier;
mod quota_tracker;

pub use crawler_paginated::*;
pub use exporter_csv::*;
pub use fetcher_graphql::*;
pub use fetcher_retrier::*;
pub use fetcher_throttler::*;
pub use orchestrator::*;
pub use persister_postgresql::*;
pub use persister_retrier::*;
pub use quota_tracker::*;
