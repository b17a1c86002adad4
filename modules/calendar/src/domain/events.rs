use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Transport-agnostic domain event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarDomainEvent {
    UserRegistered { id: Uuid, at: DateTime<Utc> },
    EventCreated { id: Uuid, children: u32, at: DateTime<Utc> },
    EventUpdated { id: Uuid, at: DateTime<Utc> },
    EventDeleted { id: Uuid, at: DateTime<Utc> },
    NotificationSent { id: Uuid, recipient: Uuid, at: DateTime<Utc> },
}
