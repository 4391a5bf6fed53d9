//! Auth Error Types
//!
//! This module provides auth-specific error variants that integrate
//! with the unified `kernel::error::AppError` system.

use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Stable machine-readable error codes
pub mod code {
    pub const VALIDATION: &str = "VALIDATION_ERROR";
    pub const AUTHENTICATION: &str = "AUTHENTICATION_ERROR";
    pub const CONFLICT: &str = "CONFLICT_ERROR";
    pub const DATABASE: &str = "DATABASE_ERROR";
    pub const NOT_FOUND: &str = "NOT_FOUND_ERROR";
    pub const INTERNAL: &str = "INTERNAL_ERROR";
}

/// Auth-specific error variants
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing or malformed input
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Invalid credentials (rejected by the user directory)
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Token signature was valid but it has expired
    #[error("Token expired")]
    TokenExpired,

    /// Token is malformed, tampered, of the wrong type, or from another issuer
    #[error("Token invalid")]
    TokenInvalid,

    /// Token subject does not match the expected user
    #[error("Token subject mismatch")]
    TokenSubjectMismatch,

    /// No active session for the presented token
    #[error("Session not found or inactive")]
    SessionNotFound,

    /// Session row has expired
    #[error("Session expired")]
    SessionExpired,

    /// Store rejected a write that collides with existing state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Store failure; the driver error is logged, never carried
    #[error("Database error during {operation}: {context}")]
    Database {
        operation: &'static str,
        context: String,
        kind: ErrorKind,
    },

    /// Required lookup miss
    #[error("{0} not found")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Wrap a store failure with the attempted operation and its data
    ///
    /// The driver error is classified through `kernel`, logged, and dropped.
    /// Unique-constraint violations surface as [`AuthError::Conflict`].
    pub fn database(operation: &'static str, context: impl Into<String>, err: sqlx::Error) -> Self {
        let context = context.into();
        tracing::error!(operation, context = %context, error = %err, "Session store error");

        let app_err = AppError::from(err);
        match app_err.kind() {
            ErrorKind::Conflict => AuthError::Conflict(format!("{operation}: {context}")),
            kind => AuthError::Database {
                operation,
                context,
                kind,
            },
        }
    }

    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => code::VALIDATION,
            AuthError::InvalidCredentials
            | AuthError::TokenExpired
            | AuthError::TokenInvalid
            | AuthError::TokenSubjectMismatch
            | AuthError::SessionNotFound
            | AuthError::SessionExpired => code::AUTHENTICATION,
            AuthError::Conflict(_) => code::CONFLICT,
            AuthError::Database { .. } => code::DATABASE,
            AuthError::NotFound(_) => code::NOT_FOUND,
            AuthError::Internal(_) => code::INTERNAL,
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Validation(_) => ErrorKind::BadRequest,
            AuthError::InvalidCredentials
            | AuthError::TokenExpired
            | AuthError::TokenInvalid
            | AuthError::TokenSubjectMismatch
            | AuthError::SessionNotFound
            | AuthError::SessionExpired => ErrorKind::Unauthorized,
            AuthError::Conflict(_) => ErrorKind::Conflict,
            AuthError::Database { kind, .. } => *kind,
            AuthError::NotFound(_) => ErrorKind::NotFound,
            AuthError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Whether this is one of the authentication failures
    pub fn is_authentication(&self) -> bool {
        self.code() == code::AUTHENTICATION
    }

    /// Transient resource condition (e.g. pool exhaustion); the caller may retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::Database { kind, .. } if kind.is_retryable())
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        AppError::new(self.kind(), self.to_string()).with_code(self.code())
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        match self {
            // Already logged with the driver error in `AuthError::database`
            AuthError::Database { .. } => {}
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            AuthError::TokenSubjectMismatch => {
                tracing::warn!("Refresh token subject mismatch detected");
            }
            AuthError::Conflict(msg) => {
                tracing::warn!(message = %msg, "Session store conflict");
            }
            _ => {
                tracing::debug!(error = %self, code = self.code(), "Auth error");
            }
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        err.to_app_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_failures_share_code() {
        for err in [
            AuthError::InvalidCredentials,
            AuthError::TokenExpired,
            AuthError::TokenInvalid,
            AuthError::TokenSubjectMismatch,
            AuthError::SessionNotFound,
            AuthError::SessionExpired,
        ] {
            assert_eq!(err.code(), "AUTHENTICATION_ERROR");
            assert_eq!(err.kind(), ErrorKind::Unauthorized);
            assert!(err.is_authentication());
        }
    }

    #[test]
    fn test_codes() {
        assert_eq!(AuthError::Validation("x".into()).code(), "VALIDATION_ERROR");
        assert_eq!(AuthError::Conflict("x".into()).code(), "CONFLICT_ERROR");
        assert_eq!(AuthError::NotFound("User".into()).code(), "NOT_FOUND_ERROR");
        assert_eq!(AuthError::Internal("x".into()).code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_pool_timeout_is_retryable_database_error() {
        let err = AuthError::database("insert", "session for user 1", sqlx::Error::PoolTimedOut);

        assert_eq!(err.code(), "DATABASE_ERROR");
        assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);
        assert!(err.is_retryable());
        // Attempted data is kept, the driver message is not
        let message = err.to_string();
        assert!(message.contains("insert"));
        assert!(message.contains("session for user 1"));
        assert!(!message.contains("pool timed out"));
    }

    /// Postgres error carrying only a SQLSTATE
    #[derive(Debug)]
    struct PgState(&'static str);

    impl std::fmt::Display for PgState {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "SQLSTATE {}", self.0)
        }
    }

    impl std::error::Error for PgState {}

    impl sqlx::error::DatabaseError for PgState {
        fn message(&self) -> &str {
            self.0
        }

        fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
            Some(self.0.into())
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            match self.0 {
                "23505" => sqlx::error::ErrorKind::UniqueViolation,
                _ => sqlx::error::ErrorKind::Other,
            }
        }
    }

    #[test]
    fn test_unique_violation_becomes_conflict() {
        let err = AuthError::database(
            "insert",
            "session 1 for user 2",
            sqlx::Error::Database(Box::new(PgState("23505"))),
        );

        assert!(matches!(err, AuthError::Conflict(_)));
        assert_eq!(err.code(), "CONFLICT_ERROR");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_serialization_failure_is_retryable() {
        let err = AuthError::database(
            "commit",
            "session transaction",
            sqlx::Error::Database(Box::new(PgState("40001"))),
        );

        assert_eq!(err.code(), "DATABASE_ERROR");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_to_app_error_carries_code() {
        let app_err: AppError = AuthError::SessionExpired.into();
        assert_eq!(app_err.kind(), ErrorKind::Unauthorized);
        assert_eq!(app_err.code(), Some("AUTHENTICATION_ERROR"));
    }
}
