//! Token Issuer
//!
//! Access and refresh tokens are HS256 JWTs signed with separate secrets.
//! Expiry is checked against the injected [`Clock`], and only after the
//! signature has verified, so `TokenError::Expired` always means "genuine
//! token, too old".

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use uuid::Uuid;

use crate::application::config::{AuthConfig, ConfigError};
use crate::domain::clock::Clock;
use crate::domain::value_object::{
    refresh_token_hash::RefreshTokenHash, session_id::SessionId, user_id::UserId,
    user_role::UserRole,
};
use crate::error::{AuthError, AuthResult};

pub const ACCESS_TOKEN_TYPE: &str = "access";
pub const REFRESH_TOKEN_TYPE: &str = "refresh";

/// Token verification failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token invalid")]
    Invalid,
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::Invalid => AuthError::TokenInvalid,
        }
    }
}

/// Identity bound into an access token
#[derive(Debug, Clone)]
pub struct AccessTokenSubject {
    pub user_id: UserId,
    pub email: String,
    pub role: UserRole,
    pub session_id: SessionId,
}

/// Verified access token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub email: String,
    pub role: UserRole,
    pub sid: Uuid,
    pub typ: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

impl AccessClaims {
    pub fn user_id(&self) -> UserId {
        UserId::from_uuid(self.sub)
    }

    pub fn session_id(&self) -> SessionId {
        SessionId::from_uuid(self.sid)
    }
}

/// Verified refresh token claims; `sub` is the only identity claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub typ: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

impl RefreshClaims {
    pub fn user_id(&self) -> UserId {
        UserId::from_uuid(self.sub)
    }
}

/// Claims read from a token whose signature was NOT checked
///
/// Only a subject hint for log lines is exposed. There is deliberately no
/// way to turn it into a [`UserId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnverifiedClaims {
    subject_hint: Option<String>,
}

impl UnverifiedClaims {
    pub fn subject_hint(&self) -> Option<&str> {
        self.subject_hint.as_deref()
    }
}

/// Mints, verifies and hashes tokens
pub trait TokenIssuer: Send + Sync {
    fn create_access_token(&self, subject: &AccessTokenSubject) -> AuthResult<String>;

    fn create_refresh_token(&self, user_id: &UserId) -> AuthResult<String>;

    fn verify_access_token(&self, token: &str) -> Result<AccessClaims, TokenError>;

    fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, TokenError>;

    /// Deterministic one-way hash; the stored form of a refresh token
    fn hash_refresh_token(&self, token: &str) -> RefreshTokenHash {
        RefreshTokenHash::of(token)
    }

    /// Parse without checking the signature. Never use the result for an
    /// authorization decision.
    fn decode_without_verifying(&self, token: &str) -> Result<UnverifiedClaims, TokenError>;
}

/// Claims common to both token types
trait TypedClaims {
    fn typ(&self) -> &str;
    fn exp(&self) -> i64;
}

impl TypedClaims for AccessClaims {
    fn typ(&self) -> &str {
        &self.typ
    }
    fn exp(&self) -> i64 {
        self.exp
    }
}

impl TypedClaims for RefreshClaims {
    fn typ(&self) -> &str {
        &self.typ
    }
    fn exp(&self) -> i64 {
        self.exp
    }
}

/// JWT implementation of [`TokenIssuer`]
pub struct JwtTokenIssuer<C> {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    clock: Arc<C>,
}

impl<C: Clock> JwtTokenIssuer<C> {
    /// Build an issuer from a validated copy of `config`
    pub fn new(config: &AuthConfig, clock: Arc<C>) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            access_encoding: EncodingKey::from_secret(&config.access_token_secret),
            access_decoding: DecodingKey::from_secret(&config.access_token_secret),
            refresh_encoding: EncodingKey::from_secret(&config.refresh_token_secret),
            refresh_decoding: DecodingKey::from_secret(&config.refresh_token_secret),
            issuer: config.token_issuer.clone(),
            access_ttl: config.access_token_ttl_chrono(),
            refresh_ttl: config.refresh_token_ttl_chrono(),
            clock,
        })
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        // Checked against the injected clock in `verify`
        validation.validate_exp = false;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation
    }

    fn verify<T>(&self, token: &str, key: &DecodingKey, expected_typ: &str) -> Result<T, TokenError>
    where
        T: DeserializeOwned + TypedClaims,
    {
        let claims = decode::<T>(token, key, &self.validation())
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejected");
                TokenError::Invalid
            })?
            .claims;

        if claims.typ() != expected_typ {
            return Err(TokenError::Invalid);
        }
        if self.clock.now().timestamp() >= claims.exp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn sign<T: Serialize>(&self, claims: &T, key: &EncodingKey) -> AuthResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, key)
            .map_err(|e| AuthError::Internal(format!("Token encoding failed: {e}")))
    }
}

impl<C: Clock> TokenIssuer for JwtTokenIssuer<C> {
    fn create_access_token(&self, subject: &AccessTokenSubject) -> AuthResult<String> {
        let now = self.clock.now();
        let claims = AccessClaims {
            sub: subject.user_id.into_uuid(),
            email: subject.email.clone(),
            role: subject.role,
            sid: subject.session_id.into_uuid(),
            typ: ACCESS_TOKEN_TYPE.to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
            jti: Uuid::new_v4(),
        };
        self.sign(&claims, &self.access_encoding)
    }

    fn create_refresh_token(&self, user_id: &UserId) -> AuthResult<String> {
        let now = self.clock.now();
        let claims = RefreshClaims {
            sub: user_id.into_uuid(),
            typ: REFRESH_TOKEN_TYPE.to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.refresh_ttl).timestamp(),
            jti: Uuid::new_v4(),
        };
        self.sign(&claims, &self.refresh_encoding)
    }

    fn verify_access_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.verify(token, &self.access_decoding, ACCESS_TOKEN_TYPE)
    }

    fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        self.verify(token, &self.refresh_decoding, REFRESH_TOKEN_TYPE)
    }

    fn decode_without_verifying(&self, token: &str) -> Result<UnverifiedClaims, TokenError> {
        #[derive(Deserialize)]
        struct Subject {
            #[serde(default)]
            sub: Option<String>,
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        let data = decode::<Subject>(token, &DecodingKey::from_secret(&[]), &validation)
            .map_err(|_| TokenError::Invalid)?;
        Ok(UnverifiedClaims {
            subject_hint: data.claims.sub,
        })
    }
}
