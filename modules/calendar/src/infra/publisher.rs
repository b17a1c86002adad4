use tracing::debug;

use crate::domain::events::CalendarDomainEvent;
use crate::domain::ports::EventPublisher;

/// Publishes domain events as debug log records.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventPublisher;

impl EventPublisher<CalendarDomainEvent> for TracingEventPublisher {
    fn publish(&self, event: &CalendarDomainEvent) {
        debug!(target: "calendar.events", event = ?event, "domain event");
    }
}
