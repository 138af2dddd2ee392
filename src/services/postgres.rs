use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::time::Duration;
use thiserror::Error;

use crate::core::schema::FieldId;
use crate::models::{Ledger, LedgerEntry};

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),
}

/// PostgreSQL client for the asked/skipped ledger
///
/// The ledger is engine-owned state kept apart from the hosted profile
/// store: it records which questions Diana has already surfaced to a user
/// so the selector never repeats one.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
    ) -> Result<Self, PostgresError> {
        tracing::info!("Connecting to PostgreSQL with URL: {}", url);

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
        )
        .await
    }

    /// Load the full ledger of a user
    pub async fn get_ledger(&self, user_id: &str) -> Result<Ledger, PostgresError> {
        let query = r#"
            SELECT field_id, status, misses, asked_at
            FROM asked_fields
            WHERE user_id = $1
            ORDER BY asked_at
        "#;

        let rows = sqlx::query(query).bind(user_id).fetch_all(&self.pool).await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let field: String = row.get("field_id");
            match FieldId::parse(&field) {
                Some(field_id) => entries.push(LedgerEntry {
                    field_id,
                    status: row.get("status"),
                    misses: row.get("misses"),
                    asked_at: row.get("asked_at"),
                }),
                // Rows from a retired catalog entry are ignored
                None => tracing::warn!("Ignoring unknown ledger field '{}'", field),
            }
        }

        tracing::debug!("User {} has {} ledger entries", user_id, entries.len());

        Ok(Ledger::from_entries(entries))
    }

    /// Apply one turn's ledger changes in a single transaction.
    ///
    /// Uses INSERT ... ON CONFLICT so re-asking a field updates its existing
    /// row instead of duplicating it. All-or-nothing: a failed turn must not
    /// leave the ledger half-written.
    pub async fn apply_delta(
        &self,
        user_id: &str,
        delta: &[LedgerEntry],
    ) -> Result<(), PostgresError> {
        if delta.is_empty() {
            return Ok(());
        }

        let query = r#"
            INSERT INTO asked_fields (user_id, field_id, status, misses, asked_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, field_id)
            DO UPDATE SET
                status = EXCLUDED.status,
                misses = EXCLUDED.misses,
                asked_at = EXCLUDED.asked_at
        "#;

        let mut tx = self.pool.begin().await?;
        for entry in delta {
            sqlx::query(query)
                .bind(user_id)
                .bind(entry.field_id.as_str())
                .bind(entry.status)
                .bind(entry.misses)
                .bind(entry.asked_at)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        tracing::debug!(
            "Applied {} ledger changes for user {}",
            delta.len(),
            user_id
        );

        Ok(())
    }

    /// Clear a user's ledger (profile interview restart)
    pub async fn clear_ledger(&self, user_id: &str) -> Result<u64, PostgresError> {
        let query = r#"
            DELETE FROM asked_fields
            WHERE user_id = $1
        "#;

        let result = sqlx::query(query).bind(user_id).execute(&self.pool).await?;

        tracing::info!(
            "Cleared {} ledger entries for user {}",
            result.rows_affected(),
            user_id
        );

        Ok(result.rows_affected())
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, PostgresError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use crate::models::AskedStatus;

    #[test]
    fn test_asked_status_debug_names() {
        assert_eq!(format!("{:?}", AskedStatus::Pending), "Pending");
        assert_eq!(format!("{:?}", AskedStatus::Skipped), "Skipped");
    }
}
