pub mod enums;

mod appointment;
mod blocker;
mod commitment;
mod notification;
mod slot;

pub use appointment::Appointment;
pub use blocker::Blocker;
pub use commitment::Commitment;
pub use notification::Notification;
pub use slot::Slot;
