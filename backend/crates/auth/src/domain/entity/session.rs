//! Session Entity
//!
//! One issued refresh-token lineage bound to a user and (optionally) a
//! device. The raw refresh token is never held here, only its hash.
//!
//! A session is created active and can only ever be deactivated:
//! `CREATED(active) -> DEACTIVATED`. Nothing else about a row changes.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::domain::value_object::{
    device::{DeviceId, DeviceMetadata},
    refresh_token_hash::RefreshTokenHash,
    session_id::SessionId,
    user_id::UserId,
};
use crate::error::{AuthError, AuthResult};

/// Session entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: SessionId,
    pub user_id: UserId,
    /// SHA-256 hex of the refresh token; unique among active sessions
    pub refresh_token_hash: RefreshTokenHash,
    /// Derived fingerprint; `None` when the client reported no attributes
    pub device_id: Option<DeviceId>,
    /// User agent string (for session management display)
    pub user_agent: Option<String>,
    pub client_ip: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    is_active: bool,
}

impl Session {
    /// Create a new active session
    ///
    /// TTL is provided by the application layer (config), not hard-coded here.
    pub fn new(
        user_id: UserId,
        refresh_token_hash: RefreshTokenHash,
        device_id: Option<DeviceId>,
        metadata: &DeviceMetadata,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> AuthResult<Self> {
        if ttl <= Duration::zero() {
            return Err(AuthError::Validation(
                "session TTL must be positive".to_string(),
            ));
        }

        Ok(Self {
            session_id: SessionId::new(),
            user_id,
            refresh_token_hash,
            device_id,
            user_agent: metadata.user_agent.clone(),
            client_ip: metadata.ip_string(),
            created_at: now,
            expires_at: now + ttl,
            is_active: true,
        })
    }

    /// Rebuild a stored row
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        session_id: SessionId,
        user_id: UserId,
        refresh_token_hash: RefreshTokenHash,
        device_id: Option<DeviceId>,
        user_agent: Option<String>,
        client_ip: Option<String>,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        is_active: bool,
    ) -> Self {
        Self {
            session_id,
            user_id,
            refresh_token_hash,
            device_id,
            user_agent,
            client_ip,
            created_at,
            expires_at,
            is_active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Expired once `now` reaches `expires_at`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Active, owned by `user_id` and unexpired
    pub fn is_usable_by(&self, user_id: &UserId, now: DateTime<Utc>) -> bool {
        self.is_active && self.user_id == *user_id && !self.is_expired(now)
    }

    /// Mark inactive; returns whether this call changed anything
    pub fn deactivate(&mut self) -> bool {
        std::mem::replace(&mut self.is_active, false)
    }
}

/// Session info for listings (non-sensitive: no token hash)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub device_id: Option<String>,
    pub user_agent: Option<String>,
    pub client_ip: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<&Session> for SessionInfo {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.session_id,
            device_id: session.device_id.as_ref().map(|d| d.as_str().to_string()),
            user_agent: session.user_agent.clone(),
            client_ip: session.client_ip.clone(),
            created_at: session.created_at,
            expires_at: session.expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
    }

    fn session(ttl: Duration) -> AuthResult<Session> {
        Session::new(
            UserId::new(),
            RefreshTokenHash::of("refresh"),
            None,
            &DeviceMetadata::new("UA").with_ip("10.1.2.3".parse().unwrap()),
            now(),
            ttl,
        )
    }

    #[test]
    fn test_new_session_is_active_and_unexpired() {
        let session = session(Duration::days(7)).unwrap();

        assert!(session.is_active());
        assert!(session.expires_at > session.created_at);
        assert!(!session.is_expired(now()));
        assert_eq!(session.user_agent.as_deref(), Some("UA"));
        assert_eq!(session.client_ip.as_deref(), Some("10.1.2.3"));
    }

    #[test]
    fn test_non_positive_ttl_rejected() {
        assert!(matches!(
            session(Duration::zero()),
            Err(AuthError::Validation(_))
        ));
        assert!(session(Duration::seconds(-1)).is_err());
    }

    #[test]
    fn test_expiry_boundary() {
        let session = session(Duration::hours(1)).unwrap();

        assert!(!session.is_expired(now() + Duration::minutes(59)));
        assert!(session.is_expired(now() + Duration::hours(1)));
    }

    #[test]
    fn test_deactivate_is_one_way() {
        let mut session = session(Duration::hours(1)).unwrap();

        assert!(session.deactivate());
        assert!(!session.is_active());
        // Second call changes nothing
        assert!(!session.deactivate());
        assert!(!session.is_active());
    }

    #[test]
    fn test_is_usable_by() {
        let mut session = session(Duration::hours(1)).unwrap();
        let owner = session.user_id;

        assert!(session.is_usable_by(&owner, now()));
        assert!(!session.is_usable_by(&UserId::new(), now()));
        assert!(!session.is_usable_by(&owner, now() + Duration::hours(2)));

        session.deactivate();
        assert!(!session.is_usable_by(&owner, now()));
    }

    #[test]
    fn test_session_info_omits_hash() {
        let session = session(Duration::hours(1)).unwrap();
        let json = serde_json::to_string(&SessionInfo::from(&session)).unwrap();

        assert!(json.contains("sessionId"));
        assert!(json.contains("expiresAt"));
        assert!(!json.contains(session.refresh_token_hash.as_str()));
    }
}
