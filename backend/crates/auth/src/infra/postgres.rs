//! PostgreSQL Session Store

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::entity::session::Session;
use crate::domain::repository::{SessionStore, SessionTransaction};
use crate::domain::value_object::{
    device::DeviceId,
    refresh_token_hash::RefreshTokenHash,
    session_id::SessionId,
    session_sort::{SessionSortField, SortOrder},
    user_id::UserId,
};
use crate::error::{AuthError, AuthResult};

const SESSION_COLUMNS: &str = r#"
    session_id,
    user_id,
    refresh_token_hash,
    device_id,
    user_agent,
    client_ip,
    created_at,
    expires_at,
    is_active
"#;

/// PostgreSQL-backed session store
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete session rows that expired before `cutoff`, active or not
    pub async fn prune_expired(&self, cutoff: DateTime<Utc>) -> AuthResult<u64> {
        let deleted = sqlx::query("DELETE FROM auth_sessions WHERE expires_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::database("prune_expired", format!("cutoff {cutoff}"), e))?
            .rows_affected();

        tracing::info!(
            sessions_deleted = deleted,
            cutoff = %cutoff,
            "Pruned expired auth sessions"
        );

        Ok(deleted)
    }
}

impl SessionStore for PgSessionStore {
    type Transaction = PgSessionTransaction;

    async fn begin(&self) -> AuthResult<PgSessionTransaction> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AuthError::database("begin", "session transaction", e))?;
        Ok(PgSessionTransaction { tx })
    }
}

/// One open database transaction
pub struct PgSessionTransaction {
    tx: Transaction<'static, Postgres>,
}

impl SessionTransaction for PgSessionTransaction {
    async fn lock_user(&mut self, user_id: &UserId) -> AuthResult<()> {
        // Released at commit/rollback; works before the user has any rows
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(user_id.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| AuthError::database("lock_user", format!("user {user_id}"), e))?;
        Ok(())
    }

    async fn insert(&mut self, session: &Session) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO auth_sessions (
                session_id,
                user_id,
                refresh_token_hash,
                device_id,
                user_agent,
                client_ip,
                created_at,
                expires_at,
                is_active
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(session.session_id.as_uuid())
        .bind(session.user_id.as_uuid())
        .bind(session.refresh_token_hash.as_str())
        .bind(session.device_id.as_ref().map(|d| d.as_str()))
        .bind(&session.user_agent)
        .bind(&session.client_ip)
        .bind(session.created_at)
        .bind(session.expires_at)
        .bind(session.is_active())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            AuthError::database(
                "insert",
                format!(
                    "session {} for user {}",
                    session.session_id, session.user_id
                ),
                e,
            )
        })?;

        Ok(())
    }

    async fn find_by_refresh_token_hash(
        &mut self,
        hash: &RefreshTokenHash,
    ) -> AuthResult<Option<Session>> {
        let sql = format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM auth_sessions
            WHERE refresh_token_hash = $1
            ORDER BY is_active DESC, created_at DESC
            LIMIT 1
            FOR UPDATE
            "#
        );
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(hash.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| {
                AuthError::database("find_by_refresh_token_hash", format!("{hash:?}"), e)
            })?;

        Ok(row.map(SessionRow::into_session))
    }

    async fn find_by_id(&mut self, session_id: &SessionId) -> AuthResult<Option<Session>> {
        let sql = format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM auth_sessions
            WHERE session_id = $1
            FOR UPDATE
            "#
        );
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(session_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| AuthError::database("find_by_id", format!("session {session_id}"), e))?;

        Ok(row.map(SessionRow::into_session))
    }

    async fn count_active_by_user_id(&mut self, user_id: &UserId) -> AuthResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM auth_sessions WHERE user_id = $1 AND is_active",
        )
        .bind(user_id.as_uuid())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            AuthError::database("count_active_by_user_id", format!("user {user_id}"), e)
        })?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn deactivate_by_id(&mut self, session_id: &SessionId) -> AuthResult<bool> {
        let affected = sqlx::query(
            "UPDATE auth_sessions SET is_active = FALSE WHERE session_id = $1 AND is_active",
        )
        .bind(session_id.as_uuid())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| AuthError::database("deactivate_by_id", format!("session {session_id}"), e))?
        .rows_affected();

        Ok(affected > 0)
    }

    async fn deactivate_by_refresh_token_hash(
        &mut self,
        hash: &RefreshTokenHash,
    ) -> AuthResult<u64> {
        let affected = sqlx::query(
            "UPDATE auth_sessions SET is_active = FALSE WHERE refresh_token_hash = $1 AND is_active",
        )
        .bind(hash.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            AuthError::database("deactivate_by_refresh_token_hash", format!("{hash:?}"), e)
        })?
        .rows_affected();

        Ok(affected)
    }

    async fn deactivate_oldest_by_user_id(
        &mut self,
        user_id: &UserId,
    ) -> AuthResult<Option<SessionId>> {
        let evicted = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE auth_sessions SET is_active = FALSE
            WHERE session_id = (
                SELECT session_id
                FROM auth_sessions
                WHERE user_id = $1 AND is_active
                ORDER BY created_at ASC, session_id ASC
                LIMIT 1
                FOR UPDATE
            )
            RETURNING session_id
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| {
            AuthError::database("deactivate_oldest_by_user_id", format!("user {user_id}"), e)
        })?;

        Ok(evicted.map(SessionId::from_uuid))
    }

    async fn deactivate_active_by_user_and_device(
        &mut self,
        user_id: &UserId,
        device_id: &DeviceId,
    ) -> AuthResult<u64> {
        let affected = sqlx::query(
            r#"
            UPDATE auth_sessions SET is_active = FALSE
            WHERE user_id = $1 AND device_id = $2 AND is_active
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(device_id.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            AuthError::database(
                "deactivate_active_by_user_and_device",
                format!("user {user_id} device {device_id}"),
                e,
            )
        })?
        .rows_affected();

        Ok(affected)
    }

    async fn deactivate_all_by_user_id(&mut self, user_id: &UserId) -> AuthResult<u64> {
        let affected = sqlx::query(
            "UPDATE auth_sessions SET is_active = FALSE WHERE user_id = $1 AND is_active",
        )
        .bind(user_id.as_uuid())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            AuthError::database("deactivate_all_by_user_id", format!("user {user_id}"), e)
        })?
        .rows_affected();

        Ok(affected)
    }

    async fn list_active_by_user_id(
        &mut self,
        user_id: &UserId,
        limit: u32,
        offset: u64,
        sort_by: SessionSortField,
        sort_order: SortOrder,
    ) -> AuthResult<Vec<Session>> {
        let offset = page_offset(offset)?;
        let sql = list_active_sql(sort_by, sort_order);
        let rows = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(user_id.as_uuid())
            .bind(i64::from(limit))
            .bind(offset)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| {
                AuthError::database(
                    "list_active_by_user_id",
                    format!(
                        "user {user_id} sort {sort_by} {sort_order} \
                         limit {limit} offset {offset}"
                    ),
                    e,
                )
            })?;

        Ok(rows.into_iter().map(SessionRow::into_session).collect())
    }

    async fn commit(self) -> AuthResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| AuthError::database("commit", "session transaction", e))
    }

    async fn rollback(self) -> AuthResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| AuthError::database("rollback", "session transaction", e))
    }
}

// ============================================================================
// Query Building
// ============================================================================

/// Listing query; column and direction come from closed enums, never from input text
fn list_active_sql(sort_by: SessionSortField, sort_order: SortOrder) -> String {
    format!(
        r#"
        SELECT {SESSION_COLUMNS}
        FROM auth_sessions
        WHERE user_id = $1 AND is_active
        ORDER BY {column} {direction}, session_id {direction}
        LIMIT $2 OFFSET $3
        "#,
        column = sort_by.column(),
        direction = sort_order.keyword(),
    )
}

/// Postgres OFFSET is a signed BIGINT
fn page_offset(offset: u64) -> AuthResult<i64> {
    i64::try_from(offset)
        .map_err(|_| AuthError::Validation(format!("page offset {offset} out of range")))
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(sqlx::FromRow)]
struct SessionRow {
    session_id: Uuid,
    user_id: Uuid,
    refresh_token_hash: String,
    device_id: Option<String>,
    user_agent: Option<String>,
    client_ip: Option<String>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    is_active: bool,
}

impl SessionRow {
    fn into_session(self) -> Session {
        Session::restore(
            SessionId::from_uuid(self.session_id),
            UserId::from_uuid(self.user_id),
            RefreshTokenHash::from_db(self.refresh_token_hash),
            self.device_id.map(DeviceId::from_db),
            self.user_agent,
            self.client_ip,
            self.created_at,
            self.expires_at,
            self.is_active,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn squash(sql: &str) -> String {
        sql.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_list_sql_orders_by_whitelisted_column() {
        let sql = squash(&list_active_sql(SessionSortField::ExpiresAt, SortOrder::Desc));

        assert!(sql.contains("ORDER BY expires_at DESC, session_id DESC"));
        assert!(sql.contains("WHERE user_id = $1 AND is_active"));
        assert!(sql.ends_with("LIMIT $2 OFFSET $3"));
    }

    #[test]
    fn test_list_sql_default_order() {
        let sql = squash(&list_active_sql(
            SessionSortField::default(),
            SortOrder::default(),
        ));

        assert!(sql.contains("ORDER BY created_at ASC, session_id ASC"));
    }

    #[test]
    fn test_page_offset_range() {
        assert_eq!(page_offset(40).unwrap(), 40);
        assert_eq!(page_offset(i64::MAX as u64).unwrap(), i64::MAX);

        let err = page_offset(u64::MAX).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
