use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Timezones a user can pick at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timezone {
    Est,
    Pst,
    Cst,
}

impl Timezone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timezone::Est => "EST",
            Timezone::Pst => "PST",
            Timezone::Cst => "CST",
        }
    }
}

impl FromStr for Timezone {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EST" => Ok(Timezone::Est),
            "PST" => Ok(Timezone::Pst),
            "CST" => Ok(Timezone::Cst),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

impl fmt::Display for Timezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a recurring event repeats. `NotApplicable` ("N/A") iff the event is not recurring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecurrenceFrequency {
    Weekly,
    Monthly,
    NotApplicable,
}

impl RecurrenceFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceFrequency::Weekly => "weekly",
            RecurrenceFrequency::Monthly => "monthly",
            RecurrenceFrequency::NotApplicable => "N/A",
        }
    }
}

impl FromStr for RecurrenceFrequency {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(RecurrenceFrequency::Weekly),
            "monthly" => Ok(RecurrenceFrequency::Monthly),
            "n/a" => Ok(RecurrenceFrequency::NotApplicable),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

impl fmt::Display for RecurrenceFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned by the `FromStr` impls of the enums above.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

/// Which membership index of a user an event reference belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    /// The user authored the event (`events_created`).
    Created,
    /// The event was shared with the user (`events_shared`).
    Shared,
}

/// A shared recipient as supplied by a caller: either a user id or an email.
/// Resolved to a user id before anything is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Recipient {
    Id(Uuid),
    Email(String),
}

impl FromStr for Recipient {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(UnknownVariant(s.to_string()));
        }
        Ok(match Uuid::parse_str(trimmed) {
            Ok(id) => Recipient::Id(id),
            Err(_) => Recipient::Email(trimmed.to_string()),
        })
    }
}

impl From<Uuid> for Recipient {
    fn from(id: Uuid) -> Self {
        Recipient::Id(id)
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recipient::Id(id) => write!(f, "{id}"),
            Recipient::Email(email) => f.write_str(email),
        }
    }
}

/// A registered user with both membership indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub credential_hash: String,
    pub timezone: Timezone,
    pub role: Role,
    pub schedule: Uuid,
    pub events_created: Vec<Uuid>,
    pub events_shared: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Registration input. Hashing the credential happens before this layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub credential_hash: String,
    pub timezone: String,
    pub role: String,
}

/// Canonical event record. Recurrence children carry `original_event_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: String,
    /// Lead time in minutes before `start_time`.
    pub reminder: i64,
    pub is_recurring: bool,
    pub recurrence_frequency: RecurrenceFrequency,
    pub shared_with: Vec<Uuid>,
    pub created_by: Uuid,
    pub original_event_id: Option<Uuid>,
}

impl Event {
    /// Every user whose schedule should show this event: creator first.
    pub fn participants(&self) -> impl Iterator<Item = Uuid> + '_ {
        std::iter::once(self.created_by).chain(self.shared_with.iter().copied())
    }

    pub fn reminder_time(&self) -> DateTime<Utc> {
        self.start_time - chrono::Duration::minutes(self.reminder)
    }
}

/// Authoring input for an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub title: String,
    pub created_by: Uuid,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: String,
    pub reminder: i64,
    pub is_recurring: bool,
    pub recurrence_frequency: Option<String>,
    pub shared_with: Vec<Recipient>,
    pub number_of_occurrences: Option<i64>,
}

/// Full replacement of an event's editable fields.
/// `shared_with` is merged into the existing recipients, never replacing them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventUpdate {
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: String,
    pub reminder: i64,
    pub is_recurring: bool,
    pub recurrence_frequency: Option<String>,
    pub shared_with: Vec<Recipient>,
}

/// Stored schedule: an ordered list of event references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub id: Uuid,
    pub title: String,
    pub events: Vec<Uuid>,
}

/// Display projection of one event inside a schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledEvent {
    pub id: Uuid,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: String,
    pub description: String,
    pub reminder: i64,
    pub created_by: Uuid,
}

impl From<&Event> for ScheduledEvent {
    fn from(e: &Event) -> Self {
        Self {
            id: e.id,
            title: e.title.clone(),
            start: e.start_time,
            end: e.end_time,
            location: e.location.clone(),
            description: e.description.clone(),
            reminder: e.reminder,
            created_by: e.created_by,
        }
    }
}

/// Schedule with every resolvable reference populated; dangling ones are omitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleView {
    pub id: Uuid,
    pub title: String,
    pub events: Vec<ScheduledEvent>,
}

/// Admin overview row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserOverview {
    pub user: User,
    pub schedule: ScheduleView,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: Uuid,
    pub recipient: Uuid,
    pub kind: String,
    pub message: String,
    pub reminder_time: DateTime<Utc>,
    /// `None` while pending; set exactly once by the dispatcher.
    pub sent_time: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn is_pending(&self) -> bool {
        self.sent_time.is_none()
    }
}

/// Notification type tags produced by this module.
pub mod notification_kind {
    pub const EVENT_REMINDER: &str = "Event Reminder";
    pub const EVENT_UPDATED: &str = "Event Updated";
    pub const EVENT_DELETED: &str = "Event Deleted";
}
