//! Error taxonomy surfaced at core service boundaries.
//!
//! Per-id ingest failures are absorbed with logs and never reach this type;
//! everything that crosses a service boundary does.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("arguments are not acceptable")]
    BadArguments,
    #[error("empty phrase")]
    EmptyPhrase,
    #[error("limit is too large")]
    LimitTooLarge,
    #[error("phrase has no searchable words")]
    UnnormalizablePhrase,
    #[error("phrase too large (>4KiB)")]
    PhraseTooLarge,
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("update already running")]
    AlreadyRunning,
    #[error("unauthorized")]
    Unauthorized,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid email format")]
    InvalidEmail,
    #[error("dependency unavailable: {0}")]
    Unavailable(String),
    #[error("operation cancelled")]
    Cancelled,
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when a diesel error is a UNIQUE constraint violation.
    /// Repositories translate these into `AlreadyExists`.
    pub(crate) fn is_unique_violation(err: &diesel::result::Error) -> bool {
        matches!(
            err,
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            )
        )
    }
}
