//! Sort options for session listings

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Column a session listing is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionSortField {
    #[default]
    #[display("createdAt")]
    CreatedAt,
    #[display("expiresAt")]
    ExpiresAt,
}

impl SessionSortField {
    /// Whitelisted SQL column; never interpolate anything else into ORDER BY
    pub const fn column(&self) -> &'static str {
        match self {
            SessionSortField::CreatedAt => "created_at",
            SessionSortField::ExpiresAt => "expires_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    #[display("asc")]
    Asc,
    #[display("desc")]
    Desc,
}

impl SortOrder {
    pub const fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    /// Apply this order to an ascending comparison
    pub fn apply(&self, ordering: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn test_columns_are_whitelisted() {
        assert_eq!(SessionSortField::CreatedAt.column(), "created_at");
        assert_eq!(SessionSortField::ExpiresAt.column(), "expires_at");
        assert_eq!(SortOrder::Asc.keyword(), "ASC");
        assert_eq!(SortOrder::Desc.keyword(), "DESC");
    }

    #[test]
    fn test_deserialize_from_query_values() {
        let field: SessionSortField = serde_json::from_str("\"expiresAt\"").unwrap();
        let order: SortOrder = serde_json::from_str("\"desc\"").unwrap();
        assert_eq!(field, SessionSortField::ExpiresAt);
        assert_eq!(order, SortOrder::Desc);
        assert!(serde_json::from_str::<SessionSortField>("\"userId\"").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(SessionSortField::CreatedAt.to_string(), "createdAt");
        assert_eq!(SortOrder::Desc.to_string(), "desc");
    }

    #[test]
    fn test_apply() {
        assert_eq!(SortOrder::Asc.apply(Ordering::Less), Ordering::Less);
        assert_eq!(SortOrder::Desc.apply(Ordering::Less), Ordering::Greater);
    }
}
