//! Repository Errors
//!
//! Error types for storage operations.

/// Errors that can occur in a repository
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Unique constraint violation
    #[error("Duplicate value for {field}")]
    Duplicate { field: &'static str },

    /// Database error
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

/// Unique constraints and the field each one protects
const UNIQUE_CONSTRAINTS: &[(&str, &str)] = &[
    ("stores_stall_id_key", "stallId"),
    ("users_email_key", "email"),
    ("transactions_store_id_date_key", "storeId/date"),
];

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                let field = db_err
                    .constraint()
                    .and_then(|name| {
                        UNIQUE_CONSTRAINTS
                            .iter()
                            .find(|(constraint, _)| *constraint == name)
                            .map(|(_, field)| *field)
                    })
                    .unwrap_or("unique key");
                return RepoError::Duplicate { field };
            }
        }
        RepoError::Database(err)
    }
}

/// Repository result type
pub type RepoResult<T> = Result<T, RepoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_error_passes_through() {
        let err: RepoError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, RepoError::Database(sqlx::Error::RowNotFound)));
    }

    #[test]
    fn test_duplicate_message() {
        let err = RepoError::Duplicate { field: "stallId" };
        assert_eq!(err.to_string(), "Duplicate value for stallId");
    }
}
