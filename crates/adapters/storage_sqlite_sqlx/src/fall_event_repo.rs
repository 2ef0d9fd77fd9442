//! `SQLite` implementation of [`FallEventRepository`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use falldetect_app::ports::FallEventRepository;
use falldetect_domain::account::UserId;
use falldetect_domain::error::FallDetectError;
use falldetect_domain::fall_event::FallEvent;

use crate::error::StorageError;

struct Wrapper(FallEvent);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let fall_type: String = row.try_get("fall_type")?;
        let date: String = row.try_get("date")?;
        let time: String = row.try_get("time")?;
        let impact_severity: String = row.try_get("impact_severity")?;

        Ok(Self(FallEvent::from_parts(
            fall_type,
            date,
            time,
            impact_severity,
        )))
    }
}

const INSERT: &str = r"
    INSERT INTO fall_events (owner, fall_type, date, time, impact_severity)
    VALUES (?, ?, ?, ?, ?)
";

const SELECT_BY_OWNER: &str = "SELECT * FROM fall_events WHERE owner = ? ORDER BY id ASC";

/// `SQLite`-backed per-account fall log.
pub struct SqliteFallEventRepository {
    pool: SqlitePool,
}

impl SqliteFallEventRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl FallEventRepository for SqliteFallEventRepository {
    async fn append(&self, owner: &UserId, event: FallEvent) -> Result<FallEvent, FallDetectError> {
        sqlx::query(INSERT)
            .bind(owner.as_str())
            .bind(event.fall_type())
            .bind(event.date())
            .bind(event.time())
            .bind(event.impact_severity())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(event)
    }

    async fn list(&self, owner: &UserId) -> Result<Vec<FallEvent>, FallDetectError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_BY_OWNER)
            .bind(owner.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Config;

    async fn setup() -> SqliteFallEventRepository {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap();
        SqliteFallEventRepository::new(db.pool().clone())
    }

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[tokio::test]
    async fn should_append_and_list_in_insertion_order() {
        let repo = setup().await;
        let first = FallEvent::from_parts("Hard Fall", "2024-03-01", "09:30 AM", "2.3g");
        let second = FallEvent::from_parts("Soft Fall", "2024-03-01", "09:45 AM", "0.8");

        repo.append(&user("alice"), first.clone()).await.unwrap();
        repo.append(&user("alice"), second.clone()).await.unwrap();

        let events = repo.list(&user("alice")).await.unwrap();
        assert_eq!(events, vec![first, second]);
    }

    #[tokio::test]
    async fn should_keep_logs_separate_per_owner() {
        let repo = setup().await;
        let event = FallEvent::from_parts("Hard Fall", "2024-03-01", "09:30 AM", "2.3g");
        repo.append(&user("alice"), event).await.unwrap();

        assert!(repo.list(&user("bob")).await.unwrap().is_empty());
        assert_eq!(repo.list(&user("alice")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_keep_identical_events_as_separate_entries() {
        let repo = setup().await;
        let event = FallEvent::from_parts("Hard Fall", "2024-03-01", "09:30 AM", "2.3g");
        repo.append(&user("alice"), event.clone()).await.unwrap();
        repo.append(&user("alice"), event).await.unwrap();

        assert_eq!(repo.list(&user("alice")).await.unwrap().len(), 2);
    }
}
