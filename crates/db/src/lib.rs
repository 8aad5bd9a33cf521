pub mod bans;
pub mod chat;
#[cfg(feature = "memory")]
pub mod memory;
pub mod moderation;
pub mod questions;
pub mod schema;
pub mod users;

use expertline_common::error::{ExpertError, ExpertResult};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Create a Postgres connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> ExpertResult<PgPool> {
    tracing::info!("connecting to database");
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(|e| ExpertError::Database(e.to_string()))
}

/// Map a sqlx error, surfacing unique violations, serialization failures and
/// deadlocks as `Conflict` so callers can retry.
pub(crate) fn map_db_err(err: sqlx::Error) -> ExpertError {
    if let sqlx::Error::Database(db) = &err {
        if matches!(db.code().as_deref(), Some("23505" | "40001" | "40P01")) {
            return ExpertError::Conflict(db.message().to_string());
        }
    }
    ExpertError::Database(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_pool_fails_with_invalid_url() {
        let result = create_pool("postgres://invalid:5432/nonexistent").await;
        assert!(result.is_err());
    }

    #[test]
    fn non_database_errors_map_to_database_variant() {
        let err = map_db_err(sqlx::Error::RowNotFound);
        assert!(matches!(err, ExpertError::Database(_)));
    }
}
