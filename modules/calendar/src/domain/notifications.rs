use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::contract::model::Notification;
use crate::domain::error::DomainError;
use crate::domain::ports::Clock;
use crate::domain::repo::NotificationsRepository;
use crate::domain::validation::bounded_text;

const KIND_MAX_LEN: usize = 50;
const MESSAGE_MAX_LEN: usize = 500;

/// CRUD over notification records keyed by recipient and reminder time.
#[derive(Clone)]
pub struct NotificationStore {
    repo: Arc<dyn NotificationsRepository>,
    clock: Arc<dyn Clock>,
}

impl NotificationStore {
    pub fn new(repo: Arc<dyn NotificationsRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Store a pending notification that becomes due at `reminder_time`.
    #[instrument(
        name = "calendar.notifications.create",
        skip(self, message),
        fields(recipient = %recipient, kind = %kind)
    )]
    pub async fn create_notification(
        &self,
        recipient: Uuid,
        kind: &str,
        message: &str,
        reminder_time: DateTime<Utc>,
    ) -> Result<Notification, DomainError> {
        let notification = Notification {
            id: Uuid::new_v4(),
            recipient,
            kind: bounded_text("kind", kind, 1, KIND_MAX_LEN)?,
            message: bounded_text("message", message, 1, MESSAGE_MAX_LEN)?,
            reminder_time,
            sent_time: None,
        };

        self.repo.insert(notification.clone()).await?;
        debug!(notification_id = %notification.id, "notification stored");
        Ok(notification)
    }

    /// Notification due immediately; picked up by the next dispatcher tick.
    pub async fn notify_now(
        &self,
        recipient: Uuid,
        kind: &str,
        message: &str,
    ) -> Result<Notification, DomainError> {
        self.create_notification(recipient, kind, message, self.clock.now())
            .await
    }

    #[instrument(name = "calendar.notifications.get", skip(self), fields(notification_id = %id))]
    pub async fn get_notification_by_id(&self, id: Uuid) -> Result<Notification, DomainError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::notification_not_found(id))
    }

    #[instrument(name = "calendar.notifications.list_for_user", skip(self), fields(user_id = %user_id))]
    pub async fn get_notifications_by_user_id(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Notification>, DomainError> {
        let list = self.repo.find_by_recipient(user_id).await?;
        debug!(count = list.len(), "listed notifications");
        Ok(list)
    }
}
