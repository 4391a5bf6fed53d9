//! Value Object Module

pub mod device;
pub mod refresh_token_hash;
pub mod session_id;
pub mod session_sort;
pub mod user_id;
pub mod user_role;
