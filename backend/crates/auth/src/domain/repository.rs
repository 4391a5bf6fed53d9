//! Repository Traits
//!
//! Interfaces for data persistence and the external user directory.
//! Implementations are in the infrastructure layer (or supplied by the host
//! application, for the user directory).

use crate::domain::entity::{session::Session, user::User};
use crate::domain::value_object::{
    device::DeviceId,
    refresh_token_hash::RefreshTokenHash,
    session_id::SessionId,
    session_sort::{SessionSortField, SortOrder},
    user_id::UserId,
};
use crate::error::AuthResult;

/// User directory (external collaborator)
#[trait_variant::make(UserDirectory: Send)]
pub trait LocalUserDirectory {
    /// Check credentials; `AuthError::InvalidCredentials` when they don't match
    async fn validate_credentials(&self, identifier: &str, secret: &str) -> AuthResult<User>;

    /// Load a user; `AuthError::NotFound` on a miss
    async fn find_user_by_id(&self, user_id: &UserId) -> AuthResult<User>;
}

/// Session store
///
/// Every read and write goes through a [`SessionTransaction`], so a flow's
/// mutations either all commit or all roll back.
#[trait_variant::make(SessionStore: Send)]
pub trait LocalSessionStore {
    type Transaction: SessionTransaction;

    /// Open a transaction (may wait on the connection pool)
    async fn begin(&self) -> AuthResult<Self::Transaction>;
}

/// Operations on session rows inside one transaction
///
/// Dropping a transaction without calling [`commit`](SessionTransaction::commit)
/// discards everything it did.
#[trait_variant::make(SessionTransaction: Send)]
pub trait LocalSessionTransaction {
    /// Serialize this transaction with every other one that locks the same
    /// user, until commit or rollback. Taken before count-then-insert.
    async fn lock_user(&mut self, user_id: &UserId) -> AuthResult<()>;

    /// Insert a new session; `AuthError::Conflict` if its hash is already active
    async fn insert(&mut self, session: &Session) -> AuthResult<()>;

    /// Session keyed by this hash, preferring the active row if several exist
    async fn find_by_refresh_token_hash(
        &mut self,
        hash: &RefreshTokenHash,
    ) -> AuthResult<Option<Session>>;

    async fn find_by_id(&mut self, session_id: &SessionId) -> AuthResult<Option<Session>>;

    async fn count_active_by_user_id(&mut self, user_id: &UserId) -> AuthResult<u64>;

    /// Returns whether a row went from active to inactive
    async fn deactivate_by_id(&mut self, session_id: &SessionId) -> AuthResult<bool>;

    /// Deactivate any active session with this hash, whoever owns it
    async fn deactivate_by_refresh_token_hash(&mut self, hash: &RefreshTokenHash)
    -> AuthResult<u64>;

    /// Deactivate the user's oldest active session (by `created_at`)
    async fn deactivate_oldest_by_user_id(
        &mut self,
        user_id: &UserId,
    ) -> AuthResult<Option<SessionId>>;

    async fn deactivate_active_by_user_and_device(
        &mut self,
        user_id: &UserId,
        device_id: &DeviceId,
    ) -> AuthResult<u64>;

    async fn deactivate_all_by_user_id(&mut self, user_id: &UserId) -> AuthResult<u64>;

    async fn list_active_by_user_id(
        &mut self,
        user_id: &UserId,
        limit: u32,
        offset: u64,
        sort_by: SessionSortField,
        sort_order: SortOrder,
    ) -> AuthResult<Vec<Session>>;

    async fn commit(self) -> AuthResult<()>;

    async fn rollback(self) -> AuthResult<()>;
}
