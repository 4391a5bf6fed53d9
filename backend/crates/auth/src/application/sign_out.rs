//! Sign Out
//!
//! Deactivates one session (by its refresh token) or every session of a user.

use crate::application::session_manager::SessionManager;
use crate::application::token::TokenIssuer;
use crate::domain::clock::Clock;
use crate::domain::repository::{SessionStore, SessionTransaction, UserDirectory};
use crate::domain::value_object::{session_id::SessionId, user_id::UserId};
use crate::error::AuthResult;

impl<S, U, T, C> SessionManager<S, U, T, C>
where
    S: SessionStore,
    U: UserDirectory,
    T: TokenIssuer,
    C: Clock,
{
    /// Sign out from the session behind `refresh_token`
    ///
    /// Exactly that session is deactivated; the user's other sessions stay.
    pub async fn log_out_session(&self, refresh_token: &str) -> AuthResult<SessionId> {
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

        tx.deactivate_by_id(&session.session_id).await?;
        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            session_id = %session.session_id,
            "User signed out"
        );
        Ok(session.session_id)
    }

    /// Sign out from every session; idempotent, returns how many were active
    pub async fn deactivate_all_sessions(&self, user_id: &UserId) -> AuthResult<u64> {
        let mut tx = self.store.begin().await?;
        let deactivated = tx.deactivate_all_by_user_id(user_id).await?;
        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            deactivated,
            "User signed out from all sessions"
        );
        Ok(deactivated)
    }
}
