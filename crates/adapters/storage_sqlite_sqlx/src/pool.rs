//! Fall log database: opening, schema migration and shutdown.
//!
//! The relay worker appends falls while history queries read them, so the
//! file runs in WAL mode with a busy timeout instead of failing on contention.

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};

use crate::error::StorageError;

/// How long a writer waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the fall log lives.
pub struct Config {
    /// `sqlite:falldetect.db` for a file, `sqlite::memory:` for tests.
    pub database_url: String,
}

impl Config {
    /// Open the fall log, creating the file and schema on first run.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] for an unparsable URL, an unreachable file
    /// or a failed migration.
    pub async fn build(self) -> Result<Database, StorageError> {
        Database::open(&self.database_url).await
    }
}

/// An open fall log shared by the event and link repositories.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    async fn open(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePool::connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::debug!(url = database_url, "fall log opened");
        Ok(Self { pool })
    }

    /// Pool handed to the repositories.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for in-flight writes, then close every connection.
    ///
    /// Repositories still holding a pool clone get `PoolClosed` afterwards.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::debug!("fall log closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> Config {
        Config {
            database_url: "sqlite::memory:".to_string(),
        }
    }

    #[tokio::test]
    async fn should_create_fall_log_schema_on_first_open() {
        let db = memory().build().await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations' ORDER BY name",
        )
        .fetch_all(db.pool())
        .await
        .unwrap();

        let names: Vec<&str> = tables.iter().map(|row| row.0.as_str()).collect();
        assert_eq!(names, vec!["fall_events", "linked_users"]);
    }

    #[tokio::test]
    async fn should_reject_non_sqlite_url() {
        let config = Config {
            database_url: "postgres://localhost/falls".to_string(),
        };
        assert!(config.build().await.is_err());
    }

    #[tokio::test]
    async fn should_set_busy_timeout() {
        let db = memory().build().await.unwrap();

        let (timeout,): (i64,) = sqlx::query_as("PRAGMA busy_timeout")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(timeout, 5000);
    }

    #[tokio::test]
    async fn should_refuse_queries_from_clones_after_close() {
        let db = memory().build().await.unwrap();
        let clone = db.pool().clone();

        db.close().await;

        assert!(clone.is_closed());
        let result = sqlx::query("SELECT 1").execute(&clone).await;
        assert!(matches!(result, Err(sqlx::Error::PoolClosed)));
    }
}
