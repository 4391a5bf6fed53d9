use serde::{Deserialize, Serialize};
use std::fmt;

/// Role reported by the user directory and embedded in access tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    User,
    Moderator,
    Admin,
    SuperAdmin,
}

impl UserRole {
    #[inline]
    pub const fn code(&self) -> &'static str {
        use UserRole::*;
        match self {
            User => "user",
            Moderator => "moderator",
            Admin => "admin",
            SuperAdmin => "super_admin",
        }
    }

    /// Parse a role code; unknown codes are rejected rather than defaulted
    #[inline]
    pub fn from_code(code: &str) -> Option<Self> {
        use UserRole::*;
        match code {
            "user" => Some(User),
            "moderator" => Some(Moderator),
            "admin" => Some(Admin),
            "super_admin" => Some(SuperAdmin),
            _ => None,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
