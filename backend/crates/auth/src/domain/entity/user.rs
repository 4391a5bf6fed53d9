//! User Entity
//!
//! The slice of a user the session core needs, as returned by the external
//! user directory. Credentials never reach this crate's entities.

use crate::domain::value_object::{user_id::UserId, user_role::UserRole};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: UserId,
    pub email: String,
    pub role: UserRole,
}

impl User {
    pub fn new(user_id: UserId, email: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id,
            email: email.into(),
            role,
        }
    }
}
