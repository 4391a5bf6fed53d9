//! Refresh
//!
//! Mints a new access token for the session behind a refresh token. The
//! refresh token itself is reused until it expires, not rotated.

use crate::application::session_manager::SessionManager;
use crate::application::token::{AccessTokenSubject, TokenIssuer};
use crate::domain::clock::Clock;
use crate::domain::repository::{SessionStore, SessionTransaction, UserDirectory};
use crate::domain::value_object::{session_id::SessionId, user_id::UserId};
use crate::error::AuthResult;

/// Refresh output
#[derive(Debug, Clone)]
pub struct RefreshOutput {
    pub access_token: String,
    pub session_id: SessionId,
    pub user_id: UserId,
}

impl<S, U, T, C> SessionManager<S, U, T, C>
where
    S: SessionStore,
    U: UserDirectory,
    T: TokenIssuer,
    C: Clock,
{
    pub async fn refresh_access_token(&self, refresh_token: &str) -> AuthResult<RefreshOutput> {
        let claims = match self.tokens.verify_refresh_token(refresh_token) {
            Ok(claims) => claims,
            Err(e) => {
                self.revoke_rejected_token(refresh_token, e).await;
                return Err(e.into());
            }
        };
        let user_id = claims.user_id();
        let hash = self.tokens.hash_refresh_token(refresh_token);
        let now = self.clock.now();

        let mut tx = self.store.begin().await?;
        let found = tx.find_by_refresh_token_hash(&hash).await?;
        let session = match self.usable_session(&mut tx, found, &user_id, now).await? {
            Ok(session) => session,
            Err(rejection) => {
                tx.commit().await?;
                rejection.log();
                return Err(rejection);
            }
        };
        tx.commit().await?;

        // Fresh email/role for the new access token
        let user = self
            .users
            .find_user_by_id(&user_id)
            .await
            .inspect_err(|e| e.log())?;

        let access_token = self.tokens.create_access_token(&AccessTokenSubject {
            user_id,
            email: user.email,
            role: user.role,
            session_id: session.session_id,
        })?;

        tracing::debug!(
            user_id = %user_id,
            session_id = %session.session_id,
            "Access token refreshed"
        );

        Ok(RefreshOutput {
            access_token,
            session_id: session.session_id,
            user_id,
        })
    }
}
