use common::ProductId;
use domain::DomainError;
use thiserror::Error;

/// Errors that can occur when reading or writing products.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    ///
    /// Raised when two writers race past the application-level checks.
    #[error("Unique constraint violated: {constraint}")]
    Conflict { constraint: String },

    /// A staged update or delete targeted a product that no longer exists.
    #[error("Product not found: {0}")]
    NotFound(ProductId),

    /// The operation was cancelled before it completed.
    #[error("Operation cancelled")]
    Cancelled,

    /// A stored row no longer satisfies the domain rules.
    #[error("Stored product is invalid: {0}")]
    Corrupt(#[from] DomainError),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return StoreError::Conflict {
                constraint: db_err.constraint().unwrap_or("unique").to_string(),
            };
        }
        StoreError::Database(err)
    }
}

impl StoreError {
    /// Returns true for uniqueness conflicts.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_sqlx_errors_stay_generic() {
        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, StoreError::Database(_)));
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_domain_errors_become_corrupt() {
        let err: StoreError = DomainError::NegativeStock.into();
        assert_eq!(err.to_string(), "Stored product is invalid: Stock cannot be negative");
    }
}
