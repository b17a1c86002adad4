use async_trait::async_trait;

use crate::contract::model::Notification;

/// Hands a claimed notification to whatever transport reaches the user.
///
/// Called at most once per notification: the dispatcher only delivers
/// records it has just claimed.
#[async_trait]
pub trait NotificationDelivery: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> anyhow::Result<()>;
}
