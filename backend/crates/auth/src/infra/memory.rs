//! In-Memory Session Store
//!
//! Single-process store for tests and local tooling. A transaction holds the
//! store-wide lock from `begin` until it is committed or dropped, and works
//! on a staged copy that only replaces the shared rows on commit.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

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

#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<Mutex<Vec<Session>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed rows, in insertion order
    pub async fn sessions(&self) -> Vec<Session> {
        self.sessions.lock().await.clone()
    }
}

impl SessionStore for MemorySessionStore {
    type Transaction = MemorySessionTransaction;

    async fn begin(&self) -> AuthResult<MemorySessionTransaction> {
        let guard = self.sessions.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(MemorySessionTransaction { guard, staged })
    }
}

pub struct MemorySessionTransaction {
    guard: OwnedMutexGuard<Vec<Session>>,
    staged: Vec<Session>,
}

impl MemorySessionTransaction {
    fn active_for<'a>(&'a mut self, user_id: &'a UserId) -> impl Iterator<Item = &'a mut Session> {
        self.staged
            .iter_mut()
            .filter(move |s| s.is_active() && s.user_id == *user_id)
    }
}

impl SessionTransaction for MemorySessionTransaction {
    async fn lock_user(&mut self, _user_id: &UserId) -> AuthResult<()> {
        // The whole store is already held
        Ok(())
    }

    async fn insert(&mut self, session: &Session) -> AuthResult<()> {
        let duplicate = self.staged.iter().any(|s| {
            s.session_id == session.session_id
                || (s.is_active() && s.refresh_token_hash == session.refresh_token_hash)
        });
        if duplicate {
            return Err(AuthError::Conflict(format!(
                "insert: session {} collides with an existing row",
                session.session_id
            )));
        }
        self.staged.push(session.clone());
        Ok(())
    }

    async fn find_by_refresh_token_hash(
        &mut self,
        hash: &RefreshTokenHash,
    ) -> AuthResult<Option<Session>> {
        let active = self
            .staged
            .iter()
            .find(|s| s.is_active() && s.refresh_token_hash == *hash);
        let latest = || self.staged.iter().rev().find(|s| s.refresh_token_hash == *hash);
        Ok(active.or_else(latest).cloned())
    }

    async fn find_by_id(&mut self, session_id: &SessionId) -> AuthResult<Option<Session>> {
        Ok(self
            .staged
            .iter()
            .find(|s| s.session_id == *session_id)
            .cloned())
    }

    async fn count_active_by_user_id(&mut self, user_id: &UserId) -> AuthResult<u64> {
        Ok(self.active_for(user_id).count() as u64)
    }

    async fn deactivate_by_id(&mut self, session_id: &SessionId) -> AuthResult<bool> {
        Ok(self
            .staged
            .iter_mut()
            .find(|s| s.session_id == *session_id)
            .is_some_and(Session::deactivate))
    }

    async fn deactivate_by_refresh_token_hash(
        &mut self,
        hash: &RefreshTokenHash,
    ) -> AuthResult<u64> {
        Ok(self
            .staged
            .iter_mut()
            .filter(|s| s.refresh_token_hash == *hash)
            .map(|s| s.deactivate())
            .filter(|changed| *changed)
            .count() as u64)
    }

    async fn deactivate_oldest_by_user_id(
        &mut self,
        user_id: &UserId,
    ) -> AuthResult<Option<SessionId>> {
        // min_by_key keeps the first of equal keys, i.e. the earliest insert
        let oldest = self.active_for(user_id).min_by_key(|s| s.created_at);
        Ok(oldest.map(|s| {
            s.deactivate();
            s.session_id
        }))
    }

    async fn deactivate_active_by_user_and_device(
        &mut self,
        user_id: &UserId,
        device_id: &DeviceId,
    ) -> AuthResult<u64> {
        Ok(self
            .active_for(user_id)
            .filter(|s| s.device_id.as_ref() == Some(device_id))
            .map(|s| s.deactivate())
            .count() as u64)
    }

    async fn deactivate_all_by_user_id(&mut self, user_id: &UserId) -> AuthResult<u64> {
        Ok(self.active_for(user_id).map(|s| s.deactivate()).count() as u64)
    }

    async fn list_active_by_user_id(
        &mut self,
        user_id: &UserId,
        limit: u32,
        offset: u64,
        sort_by: SessionSortField,
        sort_order: SortOrder,
    ) -> AuthResult<Vec<Session>> {
        let mut active: Vec<Session> = self.active_for(user_id).map(|s| s.clone()).collect();
        active.sort_by(|a, b| {
            let ordering = match sort_by {
                SessionSortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SessionSortField::ExpiresAt => a.expires_at.cmp(&b.expires_at),
            };
            sort_order.apply(ordering)
        });

        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        Ok(active
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .collect())
    }

    async fn commit(mut self) -> AuthResult<()> {
        *self.guard = std::mem::take(&mut self.staged);
        Ok(())
    }

    async fn rollback(self) -> AuthResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::device::DeviceMetadata;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn session(user_id: UserId, token: &str, created: i64) -> Session {
        Session::new(
            user_id,
            RefreshTokenHash::of(token),
            Some(DeviceId::from_db(format!("device-{token}"))),
            &DeviceMetadata::default(),
            at(created),
            Duration::days(7),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_commit_publishes_and_drop_discards() {
        let store = MemorySessionStore::new();
        let user_id = UserId::new();

        let mut tx = store.begin().await.unwrap();
        tx.insert(&session(user_id, "a", 0)).await.unwrap();
        drop(tx);
        assert!(store.sessions().await.is_empty());

        let mut tx = store.begin().await.unwrap();
        tx.insert(&session(user_id, "a", 0)).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.sessions().await.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_active_hash_conflicts() {
        let store = MemorySessionStore::new();
        let user_id = UserId::new();

        let mut tx = store.begin().await.unwrap();
        tx.insert(&session(user_id, "same", 0)).await.unwrap();
        let err = tx.insert(&session(user_id, "same", 1)).await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));

        // Allowed once the first is inactive
        tx.deactivate_by_refresh_token_hash(&RefreshTokenHash::of("same"))
            .await
            .unwrap();
        tx.insert(&session(user_id, "same", 2)).await.unwrap();

        let found = tx
            .find_by_refresh_token_hash(&RefreshTokenHash::of("same"))
            .await
            .unwrap()
            .unwrap();
        assert!(found.is_active());
        assert_eq!(found.created_at, at(2));
    }

    #[tokio::test]
    async fn test_deactivate_oldest_and_device() {
        let store = MemorySessionStore::new();
        let user_id = UserId::new();
        let first = session(user_id, "a", 0);
        let second = session(user_id, "b", 1);

        let mut tx = store.begin().await.unwrap();
        tx.insert(&second).await.unwrap();
        tx.insert(&first).await.unwrap();

        let evicted = tx.deactivate_oldest_by_user_id(&user_id).await.unwrap();
        assert_eq!(evicted, Some(first.session_id));
        assert_eq!(tx.count_active_by_user_id(&user_id).await.unwrap(), 1);

        let device = second.device_id.clone().unwrap();
        let replaced = tx
            .deactivate_active_by_user_and_device(&user_id, &device)
            .await
            .unwrap();
        assert_eq!(replaced, 1);
        assert_eq!(tx.deactivate_oldest_by_user_id(&user_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_deactivate_all_is_idempotent() {
        let store = MemorySessionStore::new();
        let user_id = UserId::new();
        let other = UserId::new();

        let mut tx = store.begin().await.unwrap();
        tx.insert(&session(user_id, "a", 0)).await.unwrap();
        tx.insert(&session(user_id, "b", 1)).await.unwrap();
        tx.insert(&session(other, "c", 2)).await.unwrap();

        assert_eq!(tx.deactivate_all_by_user_id(&user_id).await.unwrap(), 2);
        assert_eq!(tx.deactivate_all_by_user_id(&user_id).await.unwrap(), 0);
        assert_eq!(tx.count_active_by_user_id(&other).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_sorts_and_pages() {
        let store = MemorySessionStore::new();
        let user_id = UserId::new();

        let mut tx = store.begin().await.unwrap();
        for (i, token) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            tx.insert(&session(user_id, token, i as i64)).await.unwrap();
        }

        let page = tx
            .list_active_by_user_id(&user_id, 2, 2, SessionSortField::CreatedAt, SortOrder::Asc)
            .await
            .unwrap();
        let created: Vec<_> = page.iter().map(|s| s.created_at).collect();
        assert_eq!(created, vec![at(2), at(3)]);

        let newest = tx
            .list_active_by_user_id(&user_id, 1, 0, SessionSortField::CreatedAt, SortOrder::Desc)
            .await
            .unwrap();
        assert_eq!(newest[0].created_at, at(4));

        let beyond = tx
            .list_active_by_user_id(&user_id, 10, 50, SessionSortField::ExpiresAt, SortOrder::Asc)
            .await
            .unwrap();
        assert!(beyond.is_empty());
    }
}
