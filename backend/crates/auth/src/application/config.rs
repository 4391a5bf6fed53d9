//! Application Configuration
//!
//! Configuration for the Auth application layer.

use std::fmt;
use std::time::Duration;

use platform::crypto::from_base64;
use thiserror::Error;

/// Minimum signing secret length in bytes (HS256 key size)
pub const MIN_SECRET_LEN: usize = 32;

pub const ENV_ACCESS_TOKEN_SECRET: &str = "AUTH_ACCESS_TOKEN_SECRET";
pub const ENV_REFRESH_TOKEN_SECRET: &str = "AUTH_REFRESH_TOKEN_SECRET";
pub const ENV_ACCESS_TOKEN_TTL_SECS: &str = "AUTH_ACCESS_TOKEN_TTL_SECS";
pub const ENV_REFRESH_TOKEN_TTL_SECS: &str = "AUTH_REFRESH_TOKEN_TTL_SECS";
pub const ENV_MAX_ACTIVE_SESSIONS: &str = "AUTH_MAX_ACTIVE_SESSIONS";
pub const ENV_TOKEN_ISSUER: &str = "AUTH_TOKEN_ISSUER";

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Auth application configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// Active sessions allowed per user before the oldest is evicted
    pub max_active_sessions: u32,
    /// Access token TTL (15 minutes)
    pub access_token_ttl: Duration,
    /// Refresh token and session TTL (1 week)
    pub refresh_token_ttl: Duration,
    /// HS256 secret for access tokens
    pub access_token_secret: Vec<u8>,
    /// HS256 secret for refresh tokens
    pub refresh_token_secret: Vec<u8>,
    /// `iss` claim written and required on every token
    pub token_issuer: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            max_active_sessions: 5,
            access_token_ttl: Duration::from_secs(15 * 60), // 15 minutes
            refresh_token_ttl: Duration::from_secs(7 * 24 * 3600), // 1 week
            access_token_secret: vec![0u8; MIN_SECRET_LEN],
            refresh_token_secret: vec![0u8; MIN_SECRET_LEN],
            token_issuer: "auth".to_string(),
        }
    }
}

// Secrets stay out of logs
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("max_active_sessions", &self.max_active_sessions)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("access_token_secret", &"<redacted>")
            .field("refresh_token_secret", &"<redacted>")
            .field("token_issuer", &self.token_issuer)
            .finish()
    }
}

impl AuthConfig {
    /// Create config with random token secrets (for development)
    pub fn development() -> Self {
        use rand::RngCore;
        let mut access = vec![0u8; MIN_SECRET_LEN];
        let mut refresh = vec![0u8; MIN_SECRET_LEN];
        rand::rng().fill_bytes(&mut access);
        rand::rng().fill_bytes(&mut refresh);
        Self {
            access_token_secret: access,
            refresh_token_secret: refresh,
            ..Default::default()
        }
    }

    /// Load from process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key/value source; unset keys fall back to defaults,
    /// except the two secrets which are required.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            max_active_sessions: parse_or(
                &lookup,
                ENV_MAX_ACTIVE_SESSIONS,
                defaults.max_active_sessions,
            )?,
            access_token_ttl: secs_or(
                &lookup,
                ENV_ACCESS_TOKEN_TTL_SECS,
                defaults.access_token_ttl,
            )?,
            refresh_token_ttl: secs_or(
                &lookup,
                ENV_REFRESH_TOKEN_TTL_SECS,
                defaults.refresh_token_ttl,
            )?,
            access_token_secret: secret(&lookup, ENV_ACCESS_TOKEN_SECRET)?,
            refresh_token_secret: secret(&lookup, ENV_REFRESH_TOKEN_SECRET)?,
            token_issuer: lookup(ENV_TOKEN_ISSUER).unwrap_or(defaults.token_issuer),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the session core relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_active_sessions == 0 {
            return Err(invalid(ENV_MAX_ACTIVE_SESSIONS, "must be at least 1"));
        }
        if self.access_token_ttl.is_zero() {
            return Err(invalid(ENV_ACCESS_TOKEN_TTL_SECS, "must be positive"));
        }
        if self.refresh_token_ttl.is_zero() {
            return Err(invalid(ENV_REFRESH_TOKEN_TTL_SECS, "must be positive"));
        }
        // chrono cannot represent arbitrarily long spans
        if chrono::Duration::from_std(self.access_token_ttl).is_err() {
            return Err(invalid(ENV_ACCESS_TOKEN_TTL_SECS, "out of range"));
        }
        if chrono::Duration::from_std(self.refresh_token_ttl).is_err() {
            return Err(invalid(ENV_REFRESH_TOKEN_TTL_SECS, "out of range"));
        }
        check_secret(ENV_ACCESS_TOKEN_SECRET, &self.access_token_secret)?;
        check_secret(ENV_REFRESH_TOKEN_SECRET, &self.refresh_token_secret)?;
        if self.access_token_secret == self.refresh_token_secret {
            return Err(invalid(
                ENV_REFRESH_TOKEN_SECRET,
                "must differ from the access token secret",
            ));
        }
        if self.token_issuer.trim().is_empty() {
            return Err(invalid(ENV_TOKEN_ISSUER, "must not be empty"));
        }
        Ok(())
    }

    /// Access token TTL as a chrono duration (`exp` offset)
    pub fn access_token_ttl_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.access_token_ttl).unwrap_or(chrono::Duration::MAX)
    }

    /// Refresh token TTL as a chrono duration (session `expires_at` offset)
    pub fn refresh_token_ttl_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.refresh_token_ttl).unwrap_or(chrono::Duration::MAX)
    }
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.into(),
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| invalid(key, e.to_string())),
        None => Ok(default),
    }
}

fn secs_or<F>(lookup: &F, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    parse_or(lookup, key, default.as_secs()).map(Duration::from_secs)
}

fn secret<F>(lookup: &F, key: &'static str) -> Result<Vec<u8>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).ok_or(ConfigError::Missing(key))?;
    from_base64(raw.trim()).map_err(|e| invalid(key, format!("not base64: {e}")))
}

fn check_secret(key: &'static str, secret: &[u8]) -> Result<(), ConfigError> {
    if secret.len() < MIN_SECRET_LEN {
        return Err(invalid(
            key,
            format!("must be at least {MIN_SECRET_LEN} bytes"),
        ));
    }
    if secret.iter().all(|&b| b == 0) {
        return Err(invalid(key, "must not be all zeros"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::crypto::to_base64;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, String)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn secrets() -> Vec<(&'static str, String)> {
        vec![
            (ENV_ACCESS_TOKEN_SECRET, to_base64(&[1u8; 32])),
            (ENV_REFRESH_TOKEN_SECRET, to_base64(&[2u8; 32])),
        ]
    }

    #[test]
    fn test_default_config() {
        let config = AuthConfig::default();

        assert_eq!(config.max_active_sessions, 5);
        assert_eq!(config.access_token_ttl, Duration::from_secs(900));
        assert_eq!(config.refresh_token_ttl, Duration::from_secs(604_800));
        // Zeroed secrets must be replaced before use
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_development() {
        let config1 = AuthConfig::development();
        let config2 = AuthConfig::development();

        assert_ne!(config1.access_token_secret, config2.access_token_secret);
        assert_ne!(config1.access_token_secret, config1.refresh_token_secret);
        assert!(config1.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = AuthConfig::from_lookup(lookup(&secrets())).unwrap();

        assert_eq!(config.max_active_sessions, 5);
        assert_eq!(config.token_issuer, "auth");
        assert_eq!(config.access_token_secret, vec![1u8; 32]);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let mut pairs = secrets();
        pairs.push((ENV_MAX_ACTIVE_SESSIONS, "2".into()));
        pairs.push((ENV_ACCESS_TOKEN_TTL_SECS, " 60 ".into()));
        pairs.push((ENV_TOKEN_ISSUER, "tasks-api".into()));

        let config = AuthConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.max_active_sessions, 2);
        assert_eq!(config.access_token_ttl, Duration::from_secs(60));
        assert_eq!(config.token_issuer, "tasks-api");
    }

    #[test]
    fn test_missing_secret() {
        let pairs = vec![(ENV_ACCESS_TOKEN_SECRET, to_base64(&[1u8; 32]))];
        assert_eq!(
            AuthConfig::from_lookup(lookup(&pairs)).unwrap_err(),
            ConfigError::Missing(ENV_REFRESH_TOKEN_SECRET)
        );
    }

    #[test]
    fn test_invalid_values() {
        let mut pairs = secrets();
        pairs.push((ENV_MAX_ACTIVE_SESSIONS, "0".into()));
        assert!(matches!(
            AuthConfig::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid { key: ENV_MAX_ACTIVE_SESSIONS, .. })
        ));

        let mut pairs = secrets();
        pairs.push((ENV_REFRESH_TOKEN_TTL_SECS, "a week".into()));
        assert!(AuthConfig::from_lookup(lookup(&pairs)).is_err());

        let pairs = vec![
            (ENV_ACCESS_TOKEN_SECRET, to_base64(&[1u8; 8])),
            (ENV_REFRESH_TOKEN_SECRET, to_base64(&[2u8; 32])),
        ];
        assert!(AuthConfig::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn test_shared_secret_rejected() {
        let pairs = vec![
            (ENV_ACCESS_TOKEN_SECRET, to_base64(&[7u8; 32])),
            (ENV_REFRESH_TOKEN_SECRET, to_base64(&[7u8; 32])),
        ];
        assert!(AuthConfig::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = AuthConfig::development();
        let debug = format!("{config:?}");
        assert!(debug.contains("<redacted>"));
    }
}
