//! `SQLite` implementation of [`LinkRepository`].

use sqlx::SqlitePool;

use falldetect_app::ports::LinkRepository;
use falldetect_domain::account::{AccountLink, UserId};
use falldetect_domain::error::FallDetectError;

use crate::error::StorageError;

/// Removes every row that points at either side of a new link, so former
/// partners are unlinked too.
const DELETE_MEMBERS: &str =
    "DELETE FROM linked_users WHERE user_id IN (?, ?) OR linked_id IN (?, ?)";

const INSERT: &str = "INSERT INTO linked_users (user_id, linked_id) VALUES (?, ?)";

const SELECT_LINKED: &str = "SELECT linked_id FROM linked_users WHERE user_id = ?";

/// `SQLite`-backed caregiver links.
pub struct SqliteLinkRepository {
    pool: SqlitePool,
}

impl SqliteLinkRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl LinkRepository for SqliteLinkRepository {
    async fn link(&self, link: &AccountLink) -> Result<(), FallDetectError> {
        let (a, b) = link.members();
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;

        sqlx::query(DELETE_MEMBERS)
            .bind(a.as_str())
            .bind(b.as_str())
            .bind(a.as_str())
            .bind(b.as_str())
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;

        for (user, linked) in [(a, b), (b, a)] {
            sqlx::query(INSERT)
                .bind(user.as_str())
                .bind(linked.as_str())
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;
        }

        tx.commit().await.map_err(StorageError::from)?;
        Ok(())
    }

    async fn linked_user(&self, user: &UserId) -> Result<Option<UserId>, FallDetectError> {
        let row: Option<(String,)> = sqlx::query_as(SELECT_LINKED)
            .bind(user.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        row.map(|(linked,)| UserId::new(linked))
            .transpose()
            .map_err(FallDetectError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Config;

    async fn setup() -> SqliteLinkRepository {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap();
        SqliteLinkRepository::new(db.pool().clone())
    }

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn link(a: &str, b: &str) -> AccountLink {
        AccountLink::new(user(a), user(b)).unwrap()
    }

    #[tokio::test]
    async fn should_return_none_when_unlinked() {
        let repo = setup().await;
        assert_eq!(repo.linked_user(&user("alice")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn should_link_both_directions() {
        let repo = setup().await;
        repo.link(&link("alice", "bob")).await.unwrap();

        assert_eq!(
            repo.linked_user(&user("alice")).await.unwrap(),
            Some(user("bob"))
        );
        assert_eq!(
            repo.linked_user(&user("bob")).await.unwrap(),
            Some(user("alice"))
        );
    }

    #[tokio::test]
    async fn should_replace_previous_link_of_either_side() {
        let repo = setup().await;
        repo.link(&link("alice", "bob")).await.unwrap();
        repo.link(&link("alice", "carol")).await.unwrap();

        assert_eq!(
            repo.linked_user(&user("alice")).await.unwrap(),
            Some(user("carol"))
        );
        assert_eq!(repo.linked_user(&user("bob")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn should_allow_relinking_same_pair() {
        let repo = setup().await;
        repo.link(&link("alice", "bob")).await.unwrap();
        repo.link(&link("bob", "alice")).await.unwrap();
        assert_eq!(
            repo.linked_user(&user("bob")).await.unwrap(),
            Some(user("alice"))
        );
    }
}
