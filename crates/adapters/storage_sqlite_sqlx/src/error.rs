//! Storage-specific error type wrapping sqlx errors.

use falldetect_domain::error::FallDetectError;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StorageError> for FallDetectError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_into_storage_error() {
        let err: FallDetectError = StorageError::Database(sqlx::Error::RowNotFound).into();
        assert!(matches!(err, FallDetectError::Storage(_)));
    }
}
