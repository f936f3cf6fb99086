use std::ops::Deref;

use log::debug;
use sqlx::PgPool;

use crate::{Repository, RepositoryPersister, StdResult};

/// A persister that stores repository metadata in a PostgreSQL database.
///
/// Each page is applied inside one transaction so a crash can never leave a
/// partially committed page behind, and re-applying a page after a restart
/// only refreshes the mutable fields.
pub struct PostgresPersister {
    pool: PgPool,
}

impl PostgresPersister {
    /// Creates a new `PostgresPersister` over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the `repositories` table when it does not exist yet. Safe to
    /// run on every startup.
    pub async fn provision_schema(&self) -> StdResult<()> {
        sqlx::query(
            r#"
CREATE TABLE IF NOT EXISTS repositories (
    id TEXT PRIMARY KEY,
    full_name TEXT NOT NULL UNIQUE,
    star_count BIGINT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl RepositoryPersister for PostgresPersister {
    async fn persist(&self, data: &[Repository]) -> StdResult<u32> {
        let mut transaction = self.pool.begin().await?;
        let mut total_inserted = 0;
        for repository in data {
            let row: (bool,) = sqlx::query_as(
                r#"
INSERT INTO repositories (id, full_name, star_count, created_at)
VALUES ($1, $2, $3, $4)
ON CONFLICT (id) DO UPDATE
SET star_count = EXCLUDED.star_count,
    created_at = EXCLUDED.created_at
RETURNING (xmax = 0) AS inserted
                "#,
            )
            .bind(repository.identity())
            .bind(repository.full_name().as_str())
            .bind(*repository.star_count().deref() as i64)
            .bind(repository.created_at())
            .fetch_one(&mut *transaction)
            .await?;
            if row.0 {
                debug!("Inserted {repository}");
                total_inserted += 1;
            } else {
                debug!("Updated {repository}");
            }
        }
        transaction.commit().await?;

        Ok(total_inserted)
    }
}
