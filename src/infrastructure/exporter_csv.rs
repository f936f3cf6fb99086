use std::{io::Write, path::Path};

use chrono::{DateTime, Utc};
use log::info;
use sqlx::PgPool;

use crate::StdResult;

/// Writes the stored repositories to a CSV file, most starred first.
pub struct CsvExporter {
    pool: PgPool,
}

impl CsvExporter {
    /// Creates a new `CsvExporter` over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Exports all stored repositories and returns the number of rows written.
    pub async fn export(&self, output_path: &Path) -> StdResult<u64> {
        let rows: Vec<(String, i64, DateTime<Utc>)> = sqlx::query_as(
            "SELECT full_name, star_count, created_at FROM repositories ORDER BY star_count DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut output = Vec::new();
        writeln!(output, "full_name,star_count,created_at")?;
        for (full_name, star_count, created_at) in &rows {
            writeln!(
                output,
                "{},{},{}",
                escape_csv(full_name),
                star_count,
                created_at.to_rfc3339()
            )?;
        }
        tokio::fs::write(output_path, output).await?;
        info!("Exported {} repositories to {}", rows.len(), output_path.display());

        Ok(rows.len() as u64)
    }
}

/// Escape a string for CSV output.
fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_values_are_left_untouched() {
        assert_eq!("org-1/repository-1", escape_csv("org-1/repository-1"));
    }

    #[test]
    fn values_with_separators_are_quoted() {
        assert_eq!("\"a,b\"", escape_csv("a,b"));
        assert_eq!("\"a\nb\"", escape_csv("a\nb"));
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        assert_eq!("\"a\"\"b\"", escape_csv("a\"b"));
    }
}
