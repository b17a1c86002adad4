//! Reminder dispatcher: a fixed-interval tick that claims due notifications.
//!
//! Exclusivity comes from the store's conditional `claim` (sent_time is set
//! only while still unset), so any number of dispatchers may share one store.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::error::DomainError;
use crate::domain::events::CalendarDomainEvent;
use crate::domain::ports::{Clock, EventPublisher, NotificationDelivery};
use crate::domain::repo::NotificationsRepository;

/// Outcome counters of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Pending records returned by the due query.
    pub due: usize,
    /// Records this tick moved to Sent.
    pub sent: usize,
    /// Records another tick claimed first.
    pub already_claimed: usize,
    /// Records whose claim errored; they stay pending for the next tick.
    pub failed: usize,
    /// Sent records whose delivery failed. The claim stands.
    pub undelivered: usize,
}

pub struct NotificationDispatcher {
    repo: Arc<dyn NotificationsRepository>,
    delivery: Arc<dyn NotificationDelivery>,
    publisher: Arc<dyn EventPublisher<CalendarDomainEvent>>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    instance: String,
}

impl NotificationDispatcher {
    pub fn new(
        repo: Arc<dyn NotificationsRepository>,
        delivery: Arc<dyn NotificationDelivery>,
        publisher: Arc<dyn EventPublisher<CalendarDomainEvent>>,
        clock: Arc<dyn Clock>,
        interval: Duration,
        instance: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            delivery,
            publisher,
            clock,
            interval,
            instance: instance.into(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Process every notification due at the current instant.
    ///
    /// Only the due query can fail the tick; each record is handled on its own.
    #[instrument(name = "calendar.dispatcher.tick", skip(self), fields(instance = %self.instance))]
    pub async fn tick(&self) -> Result<TickReport, DomainError> {
        let now = self.clock.now();
        let due = self.repo.find_due(now).await?;
        let mut report = TickReport {
            due: due.len(),
            ..TickReport::default()
        };

        for notification in due {
            let claimed_at = self.clock.now();
            match self.repo.claim(notification.id, claimed_at).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(notification_id = %notification.id, "already claimed");
                    report.already_claimed += 1;
                    continue;
                }
                Err(e) => {
                    error!(
                        notification_id = %notification.id,
                        error = %format!("{e:#}"),
                        "failed to claim notification"
                    );
                    report.failed += 1;
                    continue;
                }
            }

            report.sent += 1;
            let sent = crate::contract::model::Notification {
                sent_time: Some(claimed_at),
                ..notification
            };
            if let Err(e) = self.delivery.deliver(&sent).await {
                warn!(
                    notification_id = %sent.id,
                    error = %format!("{e:#}"),
                    "delivery failed after claim"
                );
                report.undelivered += 1;
            }
            self.publisher.publish(&CalendarDomainEvent::NotificationSent {
                id: sent.id,
                recipient: sent.recipient,
                at: claimed_at,
            });
        }

        if report.due > 0 {
            info!(
                due = report.due,
                sent = report.sent,
                already_claimed = report.already_claimed,
                failed = report.failed,
                "dispatcher tick finished"
            );
        }
        Ok(report)
    }

    /// Tick every `interval` until `cancel` fires. A failed tick is logged and
    /// the loop waits for the next one.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) -> anyhow::Result<()> {
        if self.interval.is_zero() {
            anyhow::bail!("dispatcher interval must be greater than zero");
        }
        info!(
            instance = %self.instance,
            interval = ?self.interval,
            "notification dispatcher started"
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        error!(error = %e, "dispatcher tick failed");
                    }
                }
            }
        }

        info!(instance = %self.instance, "notification dispatcher stopped");
        Ok(())
    }
}
