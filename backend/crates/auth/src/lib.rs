//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, clock, store/directory traits
//! - `application/` - Configuration, token issuing, session lifecycle flows
//! - `infra/` - PostgreSQL and in-memory session stores
//!
//! ## Features
//! - Login with refresh token reuse until expiry
//! - Per-user cap on active sessions (oldest evicted first)
//! - One active session per device fingerprint
//! - Access token refresh, single logout, logout everywhere
//! - Paginated listing of active sessions
//!
//! ## Security Model
//! - Access and refresh tokens are HS256 JWTs with separate secrets
//! - Refresh tokens are persisted only as SHA-256 hashes
//! - A rejected refresh token deactivates any session carrying its hash
//! - Every mutating flow runs in one transaction, serialized per user
//! - Device fingerprints are derived from client-reported attributes and
//!   can be spoofed; they group sessions, they do not authenticate

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;

// Re-exports for convenience
pub use application::{
    AuthConfig, AuthenticatedSession, ConfigError, JwtTokenIssuer, ListSessionsQuery, LoginInput,
    LoginOutput, RefreshOutput, SessionManager, SessionPage, TokenError, TokenIssuer,
};
pub use domain::{
    Clock, ManualClock, Session, SessionInfo, SessionStore, SessionTransaction, SystemClock, User,
    UserDirectory,
};
pub use error::{AuthError, AuthResult};
pub use infra::{MemorySessionStore, PgSessionStore};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

pub mod models {
    pub use crate::domain::value_object::{
        device::{DeviceFingerprint, DeviceId, DeviceMetadata},
        refresh_token_hash::RefreshTokenHash,
        session_id::SessionId,
        session_sort::{SessionSortField, SortOrder},
        user_id::UserId,
        user_role::UserRole,
    };
}
