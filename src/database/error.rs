//! Classification of low-level PostgreSQL failures.

use thiserror::Error;

/// SQLSTATE raised by PostgreSQL when a `UNIQUE` constraint is violated.
pub const UNIQUE_VIOLATION_CODE: &str = "23505";

/// Semantic outcome of a failed database operation.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Lookup matched no row.
    #[error("no matching row")]
    NotFound,

    /// Insert collided with an existing unique value.
    #[error("postgres: unique constraint violation")]
    UniqueConstraintViolation,

    /// Store unreachable or misconfigured.
    #[error("database connection failed: {0}")]
    ConnectionFailure(#[source] sqlx::Error),

    /// The store answered in a way the schema makes impossible.
    #[error("database invariant violated: {0}")]
    InvariantViolation(String),

    /// Anything else, left untouched.
    #[error(transparent)]
    Other(sqlx::Error),
}

/// Comparable projection of [`DatabaseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseErrorKind {
    NotFound,
    UniqueConstraintViolation,
    ConnectionFailure,
    InvariantViolation,
    Other,
}

impl DatabaseError {
    /// Map a raw driver error to its semantic outcome.
    ///
    /// Pure: the same input always yields the same kind, and unrelated
    /// errors are carried unchanged in [`DatabaseError::Other`].
    pub fn classify(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::Database(ref db_err)
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION_CODE) =>
            {
                Self::UniqueConstraintViolation
            },
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Configuration(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => Self::ConnectionFailure(err),
            err => Self::Other(err),
        }
    }

    /// Re-run classification on an already classified error.
    ///
    /// Sentinel variants come back as they are; only an unclassified
    /// [`DatabaseError::Other`] is inspected again.
    pub fn reclassify(self) -> Self {
        match self {
            Self::Other(err) => Self::classify(err),
            classified => classified,
        }
    }

    /// Variant of this error, suitable for equality checks.
    pub fn kind(&self) -> DatabaseErrorKind {
        match self {
            Self::NotFound => DatabaseErrorKind::NotFound,
            Self::UniqueConstraintViolation => {
                DatabaseErrorKind::UniqueConstraintViolation
            },
            Self::ConnectionFailure(_) => DatabaseErrorKind::ConnectionFailure,
            Self::InvariantViolation(_) => DatabaseErrorKind::InvariantViolation,
            Self::Other(_) => DatabaseErrorKind::Other,
        }
    }

    /// Whether the failure comes from a broken invariant rather than a
    /// runtime condition.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        Self::classify(err)
    }
}

/// Classify the error side of a driver result, passing success through.
pub fn classify<T>(
    result: Result<T, sqlx::Error>,
) -> Result<T, DatabaseError> {
    result.map_err(DatabaseError::classify)
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    use sqlx::error::{DatabaseError as SqlxDatabaseError, ErrorKind};

    use super::*;

    /// Driver error carrying an arbitrary SQLSTATE.
    #[derive(Debug)]
    struct FakePgError {
        code: &'static str,
    }

    impl fmt::Display for FakePgError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "fake postgres error {}", self.code)
        }
    }

    impl StdError for FakePgError {}

    impl SqlxDatabaseError for FakePgError {
        fn message(&self) -> &str {
            "fake postgres error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(
            &mut self,
        ) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match self.code {
                UNIQUE_VIOLATION_CODE => ErrorKind::UniqueViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    fn pg_error(code: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(FakePgError { code }))
    }

    #[test]
    fn test_unique_violation_is_recognized() {
        let err = DatabaseError::classify(pg_error(UNIQUE_VIOLATION_CODE));
        assert_eq!(err.kind(), DatabaseErrorKind::UniqueConstraintViolation);
    }

    #[test]
    fn test_other_codes_pass_through_unchanged() {
        // foreign_key_violation
        let err = DatabaseError::classify(pg_error("23503"));
        assert_eq!(err.kind(), DatabaseErrorKind::Other);

        let DatabaseError::Other(sqlx::Error::Database(inner)) = err else {
            panic!("expected the original database error");
        };
        assert_eq!(inner.code().as_deref(), Some("23503"));
        assert_eq!(inner.message(), "fake postgres error");
    }

    #[test]
    fn test_row_not_found() {
        let err = DatabaseError::classify(sqlx::Error::RowNotFound);
        assert_eq!(err.kind(), DatabaseErrorKind::NotFound);
    }

    #[test]
    fn test_connection_errors() {
        assert_eq!(
            DatabaseError::classify(sqlx::Error::PoolTimedOut).kind(),
            DatabaseErrorKind::ConnectionFailure
        );
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert_eq!(
            DatabaseError::classify(sqlx::Error::Io(io)).kind(),
            DatabaseErrorKind::ConnectionFailure
        );
    }

    #[test]
    fn test_success_passes_through() {
        let ok: Result<i64, sqlx::Error> = Ok(42);
        assert_eq!(classify(ok).unwrap(), 42);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let once = DatabaseError::classify(pg_error(UNIQUE_VIOLATION_CODE));
        let twice = DatabaseError::classify(pg_error(UNIQUE_VIOLATION_CODE))
            .reclassify();
        assert_eq!(once.kind(), twice.kind());

        let other = DatabaseError::classify(pg_error("42P01")).reclassify();
        assert_eq!(other.kind(), DatabaseErrorKind::Other);

        let not_found = DatabaseError::NotFound.reclassify().reclassify();
        assert_eq!(not_found.kind(), DatabaseErrorKind::NotFound);
    }

    #[test]
    fn test_only_invariant_violation_is_fatal() {
        assert!(DatabaseError::InvariantViolation("rows".into()).is_fatal());
        assert!(!DatabaseError::UniqueConstraintViolation.is_fatal());
        assert!(!DatabaseError::NotFound.is_fatal());
    }
}
