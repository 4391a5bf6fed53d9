//! Client identification utilities
//!
//! Device metadata as reported by the client and the device fingerprint
//! derived from it. Reading these values off a request is left to the
//! transport layer.
//!
//! ## Limitation
//! Every fingerprint attribute is client-supplied, so a client can report any
//! values it likes and impersonate another device's fingerprint. The
//! fingerprint scopes "one active session per device"; it is not an
//! authentication factor and must not be treated as one.

use std::fmt;
use std::net::IpAddr;

use crate::crypto::sha256_hex;

/// Metadata the client reports about itself at login
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceMetadata {
    /// User-Agent string (also stored on the session for display)
    pub user_agent: Option<String>,
    /// Client IP (stored on the session, not part of the fingerprint)
    pub ip: Option<IpAddr>,
    pub accept_language: Option<String>,
    /// Client platform (e.g. from User-Agent Client Hints)
    pub platform: Option<String>,
    /// IANA timezone name
    pub timezone: Option<String>,
    /// Screen geometry, e.g. `1920x1080x24`
    pub screen: Option<String>,
}

impl DeviceMetadata {
    /// Metadata with only a User-Agent
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: Some(user_agent.into()),
            ..Default::default()
        }
    }

    pub fn with_ip(mut self, ip: IpAddr) -> Self {
        self.ip = Some(ip);
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    /// Get IP as string (for database storage)
    pub fn ip_string(&self) -> Option<String> {
        self.ip.map(|ip| ip.to_string())
    }

    /// Attributes hashed into the fingerprint, in a fixed order
    fn fingerprint_attributes(&self) -> [&str; 5] {
        [
            &self.user_agent,
            &self.accept_language,
            &self.platform,
            &self.timezone,
            &self.screen,
        ]
        .map(|attr| attr.as_deref().map(str::trim).unwrap_or(""))
    }
}

/// Deterministic device identifier (SHA-256 hex of the fingerprint attributes)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(String);

impl DeviceId {
    /// Restore from a stored value
    pub fn from_db(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives [`DeviceId`]s from [`DeviceMetadata`]
pub struct DeviceFingerprint;

impl DeviceFingerprint {
    /// Derive the device id, or `None` when the client reported nothing usable
    ///
    /// Each attribute is length-prefixed before hashing so that
    /// `("ab", "c")` and `("a", "bc")` produce different ids.
    pub fn derive(metadata: &DeviceMetadata) -> Option<DeviceId> {
        let attributes = metadata.fingerprint_attributes();
        if attributes.iter().all(|attr| attr.is_empty()) {
            return None;
        }

        let mut material = String::new();
        for attr in attributes {
            material.push_str(&attr.len().to_string());
            material.push(':');
            material.push_str(attr);
            material.push('|');
        }

        Some(DeviceId(sha256_hex(material.as_bytes())))
    }
}
