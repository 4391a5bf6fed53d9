//! List Sessions
//!
//! Paginated view of a user's active sessions.

use serde::{Deserialize, Serialize};

use crate::application::session_manager::SessionManager;
use crate::application::token::TokenIssuer;
use crate::domain::clock::Clock;
use crate::domain::entity::session::SessionInfo;
use crate::domain::repository::{SessionStore, SessionTransaction, UserDirectory};
use crate::domain::value_object::{
    session_sort::{SessionSortField, SortOrder},
    user_id::UserId,
};
use crate::error::{AuthError, AuthResult};

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Pagination and ordering for a session listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListSessionsQuery {
    /// 1-based
    pub page: u32,
    pub limit: u32,
    pub sort_by: SessionSortField,
    pub sort_order: SortOrder,
}

impl Default for ListSessionsQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            sort_by: SessionSortField::default(),
            sort_order: SortOrder::default(),
        }
    }
}

impl ListSessionsQuery {
    pub fn page(page: u32, limit: u32) -> Self {
        Self {
            page,
            limit,
            ..Default::default()
        }
    }

    pub fn sorted(mut self, sort_by: SessionSortField, sort_order: SortOrder) -> Self {
        self.sort_by = sort_by;
        self.sort_order = sort_order;
        self
    }

    pub fn validate(&self) -> AuthResult<()> {
        if self.page == 0 {
            return Err(AuthError::Validation("page must be at least 1".to_string()));
        }
        if !(1..=MAX_PAGE_LIMIT).contains(&self.limit) {
            return Err(AuthError::Validation(format!(
                "limit must be between 1 and {MAX_PAGE_LIMIT}"
            )));
        }
        Ok(())
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// One page of active sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPage {
    pub sessions: Vec<SessionInfo>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl<S, U, T, C> SessionManager<S, U, T, C>
where
    S: SessionStore,
    U: UserDirectory,
    T: TokenIssuer,
    C: Clock,
{
    pub async fn list_active_sessions(
        &self,
        user_id: &UserId,
        query: ListSessionsQuery,
    ) -> AuthResult<SessionPage> {
        query.validate()?;

        // Count and page from one snapshot
        let mut tx = self.store.begin().await?;
        let total = tx.count_active_by_user_id(user_id).await?;
        let sessions = tx
            .list_active_by_user_id(
                user_id,
                query.limit,
                query.offset(),
                query.sort_by,
                query.sort_order,
            )
            .await?;
        tx.rollback().await?;

        Ok(SessionPage {
            sessions: sessions.iter().map(SessionInfo::from).collect(),
            total,
            page: query.page,
            limit: query.limit,
            total_pages: total.div_ceil(u64::from(query.limit)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults_and_offset() {
        let query = ListSessionsQuery::default();
        assert_eq!(query.page, 1);
        assert_eq!(query.offset(), 0);

        assert_eq!(ListSessionsQuery::page(2, 2).offset(), 2);
        assert_eq!(ListSessionsQuery::page(4, 25).offset(), 75);
    }

    #[test]
    fn test_query_bounds() {
        assert!(ListSessionsQuery::page(1, 1).validate().is_ok());
        assert!(ListSessionsQuery::page(1, 100).validate().is_ok());
        assert!(ListSessionsQuery::page(0, 10).validate().is_err());
        assert!(ListSessionsQuery::page(1, 0).validate().is_err());
        assert!(ListSessionsQuery::page(1, 101).validate().is_err());
    }

    #[test]
    fn test_query_deserializes_with_defaults() {
        let query: ListSessionsQuery =
            serde_json::from_str(r#"{"page":3,"sortBy":"expiresAt","sortOrder":"desc"}"#).unwrap();

        assert_eq!(query.page, 3);
        assert_eq!(query.limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(query.sort_by, SessionSortField::ExpiresAt);
        assert_eq!(query.sort_order, SortOrder::Desc);
    }
}
