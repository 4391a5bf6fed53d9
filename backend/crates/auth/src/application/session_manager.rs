//! Session Manager
//!
//! Orchestrates the session lifecycle over an injected store, user
//! directory, token issuer and clock. Each flow lives in its own module:
//!
//! - `login` - credential check, refresh token reuse, session cap
//! - `refresh` - new access token for an existing session
//! - `sign_out` - single and bulk logout
//! - `list_sessions` - paginated active sessions
//! - `check_session` - access token + live session check
//!
//! The manager itself keeps no per-session state.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::application::config::{AuthConfig, ConfigError};
use crate::application::token::{TokenError, TokenIssuer};
use crate::domain::clock::Clock;
use crate::domain::entity::session::Session;
use crate::domain::repository::{SessionStore, SessionTransaction, UserDirectory};
use crate::domain::value_object::user_id::UserId;
use crate::error::{AuthError, AuthResult};

pub struct SessionManager<S, U, T, C> {
    pub(crate) store: Arc<S>,
    pub(crate) users: Arc<U>,
    pub(crate) tokens: Arc<T>,
    pub(crate) clock: Arc<C>,
    pub(crate) config: Arc<AuthConfig>,
}

impl<S, U, T, C> Clone for SessionManager<S, U, T, C> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            users: self.users.clone(),
            tokens: self.tokens.clone(),
            clock: self.clock.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S, U, T, C> SessionManager<S, U, T, C>
where
    S: SessionStore,
    U: UserDirectory,
    T: TokenIssuer,
    C: Clock,
{
    /// Wire the collaborators together
    ///
    /// Fails when `config` breaks an invariant the flows rely on, e.g. a
    /// zero session cap.
    pub fn new(
        store: Arc<S>,
        users: Arc<U>,
        tokens: Arc<T>,
        clock: Arc<C>,
        config: Arc<AuthConfig>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            store,
            users,
            tokens,
            clock,
            config,
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Deactivate whatever session a rejected refresh token points at
    ///
    /// Runs in its own transaction. Failures are logged and swallowed; the
    /// caller always returns the original token error.
    pub(crate) async fn revoke_rejected_token(&self, token: &str, reason: TokenError) {
        // Skip the store round trip for input that is not even a JWT
        let unverified = match self.tokens.decode_without_verifying(token) {
            Ok(unverified) => unverified,
            Err(_) => {
                tracing::debug!(reason = %reason, "Unparseable refresh token rejected");
                return;
            }
        };

        let hash = self.tokens.hash_refresh_token(token);
        let result = async {
            let mut tx = self.store.begin().await?;
            let deactivated = tx.deactivate_by_refresh_token_hash(&hash).await?;
            tx.commit().await?;
            Ok::<_, AuthError>(deactivated)
        }
        .await;

        match result {
            Ok(deactivated) => tracing::warn!(
                reason = %reason,
                subject_hint = unverified.subject_hint().unwrap_or("-"),
                deactivated,
                "Rejected refresh token; matching sessions deactivated"
            ),
            Err(e) => tracing::warn!(
                reason = %reason,
                error = %e,
                "Cleanup after rejected refresh token failed"
            ),
        }
    }

    /// Check a looked-up session for use by `user_id` at `now`
    ///
    /// The outer `Result` carries store failures. The inner one is the
    /// verdict: on rejection any needed cleanup (expired row, foreign owner)
    /// has been staged in `tx`, and the caller should commit it before
    /// returning the error.
    pub(crate) async fn usable_session(
        &self,
        tx: &mut S::Transaction,
        found: Option<Session>,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> AuthResult<Result<Session, AuthError>> {
        let Some(session) = found else {
            return Ok(Err(AuthError::SessionNotFound));
        };

        if !session.is_active() {
            return Ok(Err(AuthError::SessionNotFound));
        }

        if session.user_id != *user_id {
            tracing::warn!(
                session_id = %session.session_id,
                "Session presented by a different user; deactivating"
            );
            tx.deactivate_by_id(&session.session_id).await?;
            return Ok(Err(AuthError::TokenSubjectMismatch));
        }

        if session.is_expired(now) {
            tx.deactivate_by_id(&session.session_id).await?;
            tracing::info!(
                session_id = %session.session_id,
                user_id = %session.user_id,
                "Expired session deactivated"
            );
            return Ok(Err(AuthError::SessionExpired));
        }

        Ok(Ok(session))
    }
}
