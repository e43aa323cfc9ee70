//! Notification service.

use crate::services::event_publisher::{DomainEvent, EventPublisherService, publish_quietly};
use logbook_common::{AppResult, IdGenerator};
use logbook_db::{
    entities::notification::{self, NotificationKind},
    repositories::NotificationRepository,
};
use sea_orm::Set;

/// Default page size for notification listings.
const DEFAULT_LIMIT: u64 = 50;

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    event_publisher: Option<EventPublisherService>,
    id_gen: IdGenerator,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(notification_repo: NotificationRepository) -> Self {
        Self {
            notification_repo,
            event_publisher: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    /// Store a notification for a user.
    pub async fn notify(
        &self,
        user_id: &str,
        kind: NotificationKind,
        title: &str,
        message: &str,
    ) -> AppResult<notification::Model> {
        let model = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            kind: Set(kind),
            title: Set(title.to_string()),
            message: Set(message.to_string()),
            is_read: Set(false),
            created_at: Set(chrono::Utc::now().into()),
        };

        let notification = self.notification_repo.create(model).await?;

        publish_quietly(
            self.event_publisher.as_ref(),
            DomainEvent::NotificationCreated {
                id: notification.id.clone(),
                user_id: notification.user_id.clone(),
            },
        )
        .await;

        Ok(notification)
    }

    /// Like [`Self::notify`], but failures are logged and dropped.
    ///
    /// Used after a workflow step has already been committed.
    pub async fn notify_quietly(
        &self,
        user_id: &str,
        kind: NotificationKind,
        title: &str,
        message: &str,
    ) {
        if let Err(e) = self.notify(user_id, kind, title, message).await {
            tracing::warn!(error = %e, user_id = %user_id, title = %title, "Failed to create notification");
        }
    }

    /// Get notifications for a user.
    pub async fn get_notifications(
        &self,
        user_id: &str,
        limit: Option<u64>,
        until_id: Option<&str>,
        unread_only: bool,
    ) -> AppResult<Vec<notification::Model>> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).min(100);
        self.notification_repo
            .find_by_user(user_id, limit, until_id, unread_only)
            .await
    }

    /// Mark a notification as read. Returns whether it belonged to the user.
    pub async fn mark_as_read(&self, id: &str, user_id: &str) -> AppResult<bool> {
        self.notification_repo.mark_as_read(id, user_id).await
    }

    /// Mark all notifications as read.
    pub async fn mark_all_as_read(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.mark_all_as_read(user_id).await
    }

    /// Get unread count.
    pub async fn count_unread(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.count_unread(user_id).await
    }
}
