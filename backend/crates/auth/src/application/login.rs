//! Login
//!
//! Validates credentials, then inside one per-user-locked transaction either
//! reuses the session behind a still-valid refresh token or opens a new one
//! (evicting the oldest session at the cap and replacing any session on the
//! same device).

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::application::session_manager::SessionManager;
use crate::application::token::{AccessTokenSubject, TokenIssuer};
use crate::domain::clock::Clock;
use crate::domain::entity::{session::Session, user::User};
use crate::domain::repository::{SessionStore, SessionTransaction, UserDirectory};
use crate::domain::value_object::{
    device::{DeviceFingerprint, DeviceMetadata},
    session_id::SessionId,
    user_id::UserId,
};
use crate::error::{AuthError, AuthResult};

/// Login input
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginInput {
    pub identifier: String,
    pub secret: String,
    /// Refresh token the client already holds, if any
    #[serde(default)]
    pub existing_refresh_token: Option<String>,
}

impl LoginInput {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
            existing_refresh_token: None,
        }
    }

    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.existing_refresh_token = Some(token.into());
        self
    }

    fn validate(&self) -> AuthResult<()> {
        if self.identifier.trim().is_empty() {
            return Err(AuthError::Validation("identifier is required".to_string()));
        }
        if self.secret.is_empty() {
            return Err(AuthError::Validation("secret is required".to_string()));
        }
        Ok(())
    }
}

// Never print the secret
impl std::fmt::Debug for LoginInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginInput")
            .field("identifier", &self.identifier)
            .field("has_refresh_token", &self.existing_refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

/// Login output
#[derive(Debug, Clone)]
pub struct LoginOutput {
    pub access_token: String,
    /// Present only when a new session was created
    pub refresh_token: Option<String>,
    pub is_new_refresh_token: bool,
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
    pub async fn login(
        &self,
        input: LoginInput,
        metadata: &DeviceMetadata,
    ) -> AuthResult<LoginOutput> {
        input.validate()?;

        let user = self
            .users
            .validate_credentials(input.identifier.trim(), &input.secret)
            .await
            .inspect_err(|e| e.log())?;

        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        tx.lock_user(&user.user_id).await?;

        let reused = match input.existing_refresh_token.as_deref() {
            Some(token) => self.try_reuse(&mut tx, token, &user, now).await?,
            None => None,
        };

        let (session_id, refresh_token) = match reused {
            Some(session) => (session.session_id, None),
            None => {
                let (session, token) = self.open_session(&mut tx, &user, metadata, now).await?;
                (session.session_id, Some(token))
            }
        };

        let access_token = self.tokens.create_access_token(&AccessTokenSubject {
            user_id: user.user_id,
            email: user.email.clone(),
            role: user.role,
            session_id,
        })?;

        tx.commit().await?;

        let is_new_refresh_token = refresh_token.is_some();
        tracing::info!(
            user_id = %user.user_id,
            session_id = %session_id,
            reused = !is_new_refresh_token,
            "User logged in"
        );

        Ok(LoginOutput {
            access_token,
            refresh_token,
            is_new_refresh_token,
            session_id,
            user_id: user.user_id,
        })
    }

    /// Session behind `token` if it can be reused by `user`
    ///
    /// A token that fails any check has every session with its hash
    /// deactivated, whoever owns it, and login carries on without it.
    async fn try_reuse(
        &self,
        tx: &mut S::Transaction,
        token: &str,
        user: &User,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<Session>> {
        let hash = self.tokens.hash_refresh_token(token);

        let rejection = match self.tokens.verify_refresh_token(token) {
            Err(e) => AuthError::from(e),
            Ok(claims) if claims.user_id() != user.user_id => AuthError::TokenSubjectMismatch,
            Ok(_) => match tx.find_by_refresh_token_hash(&hash).await? {
                Some(session) if session.is_usable_by(&user.user_id, now) => {
                    return Ok(Some(session));
                }
                Some(session) if session.is_active() && session.is_expired(now) => {
                    AuthError::SessionExpired
                }
                Some(session) if session.is_active() => AuthError::TokenSubjectMismatch,
                _ => AuthError::SessionNotFound,
            },
        };

        let deactivated = tx.deactivate_by_refresh_token_hash(&hash).await?;
        tracing::warn!(
            user_id = %user.user_id,
            reason = %rejection,
            deactivated,
            "Presented refresh token not reusable; issuing a new session"
        );
        Ok(None)
    }

    async fn open_session(
        &self,
        tx: &mut S::Transaction,
        user: &User,
        metadata: &DeviceMetadata,
        now: DateTime<Utc>,
    ) -> AuthResult<(Session, String)> {
        let user_id = &user.user_id;

        // Normally at most one eviction; more only if the cap was lowered
        let cap = u64::from(self.config.max_active_sessions);
        let mut active = tx.count_active_by_user_id(user_id).await?;
        while active >= cap {
            match tx.deactivate_oldest_by_user_id(user_id).await? {
                Some(evicted) => {
                    tracing::info!(
                        user_id = %user_id,
                        session_id = %evicted,
                        "Session limit reached; oldest session evicted"
                    );
                    active -= 1;
                }
                None => break,
            }
        }

        let device_id = DeviceFingerprint::derive(metadata);
        if let Some(device_id) = &device_id {
            let replaced = tx
                .deactivate_active_by_user_and_device(user_id, device_id)
                .await?;
            if replaced > 0 {
                tracing::info!(
                    user_id = %user_id,
                    replaced,
                    "Previous session on this device deactivated"
                );
            }
        }

        let refresh_token = self.tokens.create_refresh_token(user_id)?;
        let session = Session::new(
            *user_id,
            self.tokens.hash_refresh_token(&refresh_token),
            device_id,
            metadata,
            now,
            self.config.refresh_token_ttl_chrono(),
        )?;
        tx.insert(&session).await?;

        tracing::info!(
            user_id = %user_id,
            session_id = %session.session_id,
            "Session created"
        );
        Ok((session, refresh_token))
    }
}
