//! Repositories wrapping database access per entity.

mod assignment;
mod check_in;
mod log_entry;
mod notification;
mod user;

pub use assignment::AssignmentRepository;
pub use check_in::CheckInRepository;
pub use log_entry::LogEntryRepository;
pub use notification::NotificationRepository;
pub use user::UserRepository;
