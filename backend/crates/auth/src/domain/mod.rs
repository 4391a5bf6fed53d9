//! Domain Layer
//!
//! Contains entities, value objects, the clock, and repository traits.

pub mod clock;
pub mod entity;
pub mod repository;
pub mod value_object;

// Re-exports
pub use clock::{Clock, ManualClock, SystemClock};
pub use entity::{
    session::{Session, SessionInfo},
    user::User,
};
pub use repository::{SessionStore, SessionTransaction, UserDirectory};
