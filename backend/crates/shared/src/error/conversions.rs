//! Error conversions - From implementations for common error types
//!
//! Classifies driver errors into [`AppError`] so callers never have to
//! match on driver-specific variants themselves.

#[cfg(feature = "sqlx")]
use super::{app_error::AppError, kind::ErrorKind};

// ============================================================================
// SQLx conversions (feature-gated)
// ============================================================================

/// Classify a driver error without consuming it
#[cfg(feature = "sqlx")]
pub fn classify_sqlx(err: &sqlx::Error) -> (ErrorKind, &'static str) {
    match err {
        sqlx::Error::RowNotFound => (ErrorKind::NotFound, "Record not found"),
        sqlx::Error::PoolTimedOut => (
            ErrorKind::ServiceUnavailable,
            "Database connection pool exhausted",
        ),
        sqlx::Error::PoolClosed => (
            ErrorKind::ServiceUnavailable,
            "Database connection pool closed",
        ),
        sqlx::Error::Io(_) => (ErrorKind::ServiceUnavailable, "Database connection error"),
        // https://www.postgresql.org/docs/current/errcodes-appendix.html
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            // Class 23 - Integrity Constraint Violation
            Some("23505") => (ErrorKind::Conflict, "Duplicate key value"),
            Some("23000") => (ErrorKind::Conflict, "Integrity constraint violation"),
            Some("23502" | "23514") => (ErrorKind::BadRequest, "Constraint violation"),
            // Class 40 - Transaction Rollback (serialization / deadlock)
            Some("40001" | "40P01") => {
                (ErrorKind::ServiceUnavailable, "Transaction conflict, retry")
            }
            // Class 53 - Insufficient Resources, Class 57 - Operator Intervention
            Some(code) if code.starts_with("53") || code.starts_with("57") => {
                (ErrorKind::ServiceUnavailable, "Database unavailable")
            }
            _ => (ErrorKind::InternalServerError, "Database error"),
        },
        _ => (ErrorKind::InternalServerError, "Database error"),
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let (kind, message) = classify_sqlx(&err);
        AppError::new(kind, message).with_source(err)
    }
}
