//! Check Session
//!
//! Verifies an access token and confirms the session it names is still
//! live, so a logged-out session stops authorizing requests before the
//! access token's own TTL runs out.

use serde::Serialize;

use crate::application::session_manager::SessionManager;
use crate::application::token::TokenIssuer;
use crate::domain::clock::Clock;
use crate::domain::repository::{SessionStore, SessionTransaction, UserDirectory};
use crate::domain::value_object::{session_id::SessionId, user_id::UserId, user_role::UserRole};
use crate::error::{AuthError, AuthResult};

/// Identity behind a verified access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedSession {
    pub user_id: UserId,
    pub email: String,
    pub role: UserRole,
    pub session_id: SessionId,
}

impl<S, U, T, C> SessionManager<S, U, T, C>
where
    S: SessionStore,
    U: UserDirectory,
    T: TokenIssuer,
    C: Clock,
{
    pub async fn check_access_token(&self, access_token: &str) -> AuthResult<AuthenticatedSession> {
        // Access tokens are never stored, so there is nothing to clean up
        let claims = self
            .tokens
            .verify_access_token(access_token)
            .map_err(AuthError::from)
            .inspect_err(|e| e.log())?;
        let user_id = claims.user_id();
        let now = self.clock.now();

        let mut tx = self.store.begin().await?;
        let found = tx.find_by_id(&claims.session_id()).await?;
        let verdict = self.usable_session(&mut tx, found, &user_id, now).await?;
        tx.commit().await?;

        let session = verdict.inspect_err(|e| e.log())?;
        Ok(AuthenticatedSession {
            user_id,
            email: claims.email,
            role: claims.role,
            session_id: session.session_id,
        })
    }
}
