//! Business logic services.

#![allow(missing_docs)]

pub mod assignment;
pub mod check_in;
pub mod event_publisher;
pub mod geolocation;
pub mod log_entry;
pub mod notification;
pub mod user;
pub mod workflow;

pub use assignment::AssignmentService;
pub use check_in::{
    AutoCheckInOutcome, CheckInService, PresenceStatus, RecordOutcome, SkipReason,
    StudentLocationStatus,
};
pub use event_publisher::{
    DomainEvent, EventPublisher, EventPublisherService, NoOpEventPublisher,
    TracingEventPublisher,
};
pub use geolocation::{
    FixedLocation, GeolocationSampler, LocationError, LocationSource, Position, PositionCache,
    ReportedLocation, SampleOptions,
};
pub use log_entry::{LogEntryPatch, LogEntryService, NewLogEntry};
pub use notification::NotificationService;
pub use user::{CreateUserInput, UpdatePlacementInput, UserService, timezone_of};
pub use workflow::{EditLogEntryInput, ReviewDecision, SubmitLogEntryInput, WorkflowService};
