//! Repository layer — entity-scoped database operations.
//!
//! Plain functions over `&Connection`; callers own transaction boundaries.

mod appointment;
mod blocker;
mod notification;
mod setting;

// Re-export all public items from sub-modules
pub use appointment::*;
pub use blocker::*;
pub use notification::*;
pub use setting::*;
