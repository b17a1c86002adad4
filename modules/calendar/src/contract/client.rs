use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::contract::error::CalendarError;
use crate::contract::model::{
    Event, EventUpdate, Membership, NewEvent, NewUser, Notification, ScheduleView, User,
    UserOverview,
};

/// Public API of the calendar module.
///
/// Identifiers are taken as raw strings, the way they arrive from a route or
/// form; a malformed id is a validation error on the corresponding field.
#[async_trait]
pub trait CalendarApi: Send + Sync {
    /// Register a user and create their schedule.
    async fn register_user(&self, new_user: NewUser) -> Result<User, CalendarError>;

    async fn get_user(&self, id: &str) -> Result<User, CalendarError>;

    /// Every user with their populated schedule.
    async fn list_users_with_schedules(&self) -> Result<Vec<UserOverview>, CalendarError>;

    /// Create an event, share it and attach it to every participant's schedule.
    async fn create_event(&self, new_event: NewEvent) -> Result<Event, CalendarError>;

    async fn get_event(&self, id: &str) -> Result<Event, CalendarError>;

    async fn update_event(&self, id: &str, update: EventUpdate) -> Result<Event, CalendarError>;

    /// Delete an event everywhere. Returns a confirmation message.
    async fn delete_event(&self, id: &str) -> Result<String, CalendarError>;

    /// Delete an event on behalf of a user and notify them.
    async fn delete_event_for_user(
        &self,
        user_id: &str,
        event_id: &str,
    ) -> Result<String, CalendarError>;

    async fn get_schedule(&self, id: &str) -> Result<ScheduleView, CalendarError>;

    async fn add_event_to_schedule(
        &self,
        user_id: &str,
        event_id: &str,
        membership: Membership,
    ) -> Result<(), CalendarError>;

    async fn remove_event_from_schedule(
        &self,
        user_id: &str,
        event_id: &str,
    ) -> Result<(), CalendarError>;

    async fn create_notification(
        &self,
        recipient: &str,
        kind: &str,
        message: &str,
        reminder_time: DateTime<Utc>,
    ) -> Result<Notification, CalendarError>;

    /// Notifications of one user ordered by reminder time.
    async fn get_notifications(&self, user_id: &str) -> Result<Vec<Notification>, CalendarError>;
}
