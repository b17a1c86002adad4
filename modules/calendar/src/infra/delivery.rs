use async_trait::async_trait;
use tracing::info;

use crate::contract::model::Notification;
use crate::domain::ports::NotificationDelivery;

/// Delivery that writes the notification to the log. The default until a
/// real transport (mail, push) is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDelivery;

#[async_trait]
impl NotificationDelivery for LogDelivery {
    async fn deliver(&self, notification: &Notification) -> anyhow::Result<()> {
        info!(
            target: "calendar.delivery",
            notification_id = %notification.id,
            recipient = %notification.recipient,
            kind = %notification.kind,
            message = %notification.message,
            "notification delivered"
        );
        Ok(())
    }
}
