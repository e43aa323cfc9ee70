//! Event publisher service.
//!
//! Provides an abstraction for publishing domain events to whatever
//! real-time channel the deployment has. Services hold an optional publisher
//! and never fail a user action because publishing failed.

use async_trait::async_trait;
use logbook_common::AppResult;
use logbook_db::entities::log_entry::LogStatus;
use std::sync::Arc;

/// Events emitted by the core services.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// A log entry was created or changed state.
    LogEntryChanged {
        entry_id: String,
        student_id: String,
        status: LogStatus,
    },
    /// A log entry was deleted by its owner.
    LogEntryDeleted { entry_id: String, student_id: String },
    /// A check-in row was stored.
    CheckInRecorded {
        check_in_id: String,
        student_id: String,
        is_automatic: bool,
    },
    /// A notification was stored for a user.
    NotificationCreated { id: String, user_id: String },
}

impl DomainEvent {
    /// Short machine name, used as the channel or log field.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LogEntryChanged { .. } => "logEntryChanged",
            Self::LogEntryDeleted { .. } => "logEntryDeleted",
            Self::CheckInRecorded { .. } => "checkInRecorded",
            Self::NotificationCreated { .. } => "notificationCreated",
        }
    }
}

/// Trait for publishing domain events.
///
/// This allows the core services to publish events without depending on a
/// particular transport.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish one event.
    async fn publish(&self, event: DomainEvent) -> AppResult<()>;
}

/// A no-op implementation of `EventPublisher` for when real-time events are disabled.
#[derive(Clone, Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisher for NoOpEventPublisher {
    async fn publish(&self, _event: DomainEvent) -> AppResult<()> {
        Ok(())
    }
}

/// Writes every event to the tracing subscriber at debug level.
#[derive(Clone, Default)]
pub struct TracingEventPublisher;

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(&self, event: DomainEvent) -> AppResult<()> {
        tracing::debug!(event = event.name(), payload = ?event, "Domain event");
        Ok(())
    }
}

/// Wrapper for boxed `EventPublisher` trait object.
pub type EventPublisherService = Arc<dyn EventPublisher>;

/// Publish and log failures instead of returning them.
pub(crate) async fn publish_quietly(publisher: Option<&EventPublisherService>, event: DomainEvent) {
    if let Some(publisher) = publisher {
        let name = event.name();
        if let Err(e) = publisher.publish(event).await {
            tracing::warn!(error = %e, event = name, "Failed to publish event");
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use tokio::sync::Mutex;

    /// Keeps every published event in memory.
    #[derive(Default)]
    pub struct RecordingEventPublisher {
        pub events: Mutex<Vec<DomainEvent>>,
    }

    #[async_trait]
    impl EventPublisher for RecordingEventPublisher {
        async fn publish(&self, event: DomainEvent) -> AppResult<()> {
            self.events.lock().await.push(event);
            Ok(())
        }
    }
}
