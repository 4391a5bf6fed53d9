use std::fmt;

use platform::crypto::sha256_hex;

/// One-way hash of a refresh token
///
/// The only form in which a refresh token is ever persisted or looked up.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RefreshTokenHash(String);

impl RefreshTokenHash {
    /// Hash a raw refresh token (SHA-256, lowercase hex)
    pub fn of(raw_token: &str) -> Self {
        Self(sha256_hex(raw_token.as_bytes()))
    }

    /// Restore from a stored value
    pub fn from_db(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Only a prefix is shown so hashes don't end up whole in logs
impl fmt::Debug for RefreshTokenHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(8).collect();
        write!(f, "RefreshTokenHash({prefix}…)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(RefreshTokenHash::of("token"), RefreshTokenHash::of("token"));
        assert_ne!(RefreshTokenHash::of("token"), RefreshTokenHash::of("token2"));
    }

    #[test]
    fn test_hash_never_contains_raw_token() {
        let hash = RefreshTokenHash::of("eyJhbGciOiJIUzI1NiJ9.payload.sig");
        assert_eq!(hash.as_str().len(), 64);
        assert!(!hash.as_str().contains("payload"));
    }

    #[test]
    fn test_debug_is_truncated() {
        let hash = RefreshTokenHash::of("token");
        let debug = format!("{hash:?}");
        assert!(debug.len() < hash.as_str().len());
    }
}
