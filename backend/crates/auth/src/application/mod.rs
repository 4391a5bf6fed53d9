//! Application Layer
//!
//! Configuration, token issuing, and the session lifecycle flows.

pub mod check_session;
pub mod config;
pub mod list_sessions;
pub mod login;
pub mod refresh;
pub mod session_manager;
pub mod sign_out;
pub mod token;

// Re-exports
pub use check_session::AuthenticatedSession;
pub use config::{AuthConfig, ConfigError};
pub use list_sessions::{ListSessionsQuery, SessionPage};
pub use login::{LoginInput, LoginOutput};
pub use refresh::RefreshOutput;
pub use session_manager::SessionManager;
pub use token::{
    AccessClaims, AccessTokenSubject, JwtTokenIssuer, RefreshClaims, TokenError, TokenIssuer,
    UnverifiedClaims,
};
