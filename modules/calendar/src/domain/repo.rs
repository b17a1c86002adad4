//! Persistence ports the domain needs.
//!
//! The backing store is a document store: each method is one round-trip and
//! atomic for the single document it touches. Nothing here spans documents
//! transactionally; multi-document flows are sequenced by the services.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::contract::model::{
    Event, Membership, Notification, RecurrenceFrequency, Schedule, User,
};

#[async_trait]
pub trait UsersRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    /// `email` must already be normalized.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn list(&self) -> anyhow::Result<Vec<User>>;
    /// Insert a fully-formed user. Returns false if the email is taken.
    async fn insert(&self, user: User) -> anyhow::Result<bool>;
    /// Append `event_id` to one membership index. Returns false if no user matched.
    async fn push_membership(
        &self,
        user_id: Uuid,
        membership: Membership,
        event_id: Uuid,
    ) -> anyhow::Result<bool>;
    /// Remove every occurrence of `event_id` from one membership index.
    /// Returns false if no user matched.
    async fn pull_membership(
        &self,
        user_id: Uuid,
        membership: Membership,
        event_id: Uuid,
    ) -> anyhow::Result<bool>;
    /// Remove `event_id` from every user's `events_shared`. Returns the number of users modified.
    async fn pull_shared_everywhere(&self, event_id: Uuid) -> anyhow::Result<u64>;
}

/// Field replacement plus set-union of recipients, applied atomically to one event.
#[derive(Debug, Clone)]
pub struct EventPatch {
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: String,
    pub reminder: i64,
    pub is_recurring: bool,
    pub recurrence_frequency: RecurrenceFrequency,
    /// Added to `shared_with` unless already present; existing entries are kept in order.
    pub add_shared_with: Vec<Uuid>,
}

#[async_trait]
pub trait EventsRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Event>>;
    /// Events for the given ids; ids with no record are skipped. Order follows `ids`.
    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Event>>;
    /// Children produced by recurrence expansion of `parent_id`.
    async fn find_by_original(&self, parent_id: Uuid) -> anyhow::Result<Vec<Event>>;
    async fn insert(&self, event: Event) -> anyhow::Result<()>;
    /// Apply the patch and return the updated record, or `None` if nothing matched.
    async fn apply_patch(&self, id: Uuid, patch: EventPatch) -> anyhow::Result<Option<Event>>;
    /// Find-one-and-delete. Returns the removed record.
    async fn delete(&self, id: Uuid) -> anyhow::Result<Option<Event>>;
}

#[async_trait]
pub trait SchedulesRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Schedule>>;
    async fn insert(&self, schedule: Schedule) -> anyhow::Result<()>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
    /// Append (duplicates allowed). Returns false if no schedule matched.
    async fn push_event(&self, schedule_id: Uuid, event_id: Uuid) -> anyhow::Result<bool>;
    /// Remove every occurrence. Returns false if no schedule matched.
    async fn pull_event(&self, schedule_id: Uuid, event_id: Uuid) -> anyhow::Result<bool>;
    /// Remove `event_id` from all schedules. Returns the number of schedules modified.
    async fn pull_event_everywhere(&self, event_id: Uuid) -> anyhow::Result<u64>;
}

#[async_trait]
pub trait NotificationsRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Notification>>;
    /// All notifications of one recipient, ordered by `reminder_time`.
    async fn find_by_recipient(&self, recipient: Uuid) -> anyhow::Result<Vec<Notification>>;
    /// Pending notifications with `reminder_time <= now`, ordered by `reminder_time`.
    async fn find_due(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<Notification>>;
    async fn insert(&self, notification: Notification) -> anyhow::Result<()>;
    /// Conditional update: set `sent_time = at` only while it is still unset.
    /// Returns true iff this call performed the transition.
    async fn claim(&self, id: Uuid, at: DateTime<Utc>) -> anyhow::Result<bool>;
}
