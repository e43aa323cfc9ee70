//! Database entities.

pub mod assignment;
pub mod check_in;
pub mod log_entry;
pub mod notification;
pub mod user;

pub use assignment::Entity as Assignment;
pub use check_in::Entity as CheckIn;
pub use log_entry::Entity as LogEntry;
pub use notification::Entity as Notification;
pub use user::Entity as User;
