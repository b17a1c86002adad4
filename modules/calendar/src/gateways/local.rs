use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::contract::{
    client::CalendarApi,
    error::CalendarError,
    model::{
        Event, EventUpdate, Membership, NewEvent, NewUser, Notification, ScheduleView, User,
        UserOverview,
    },
};
use crate::domain::{service::CalendarService, validation::parse_id};

/// Local implementation of the CalendarApi trait that delegates to the domain service
pub struct CalendarLocalClient {
    service: Arc<CalendarService>,
}

impl CalendarLocalClient {
    pub fn new(service: Arc<CalendarService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl CalendarApi for CalendarLocalClient {
    async fn register_user(&self, new_user: NewUser) -> Result<User, CalendarError> {
        Ok(self.service.register_user(new_user).await?)
    }

    async fn get_user(&self, id: &str) -> Result<User, CalendarError> {
        let id = parse_id("id", id)?;
        Ok(self.service.get_user_by_id(id).await?)
    }

    async fn list_users_with_schedules(&self) -> Result<Vec<UserOverview>, CalendarError> {
        Ok(self.service.list_users_with_schedules().await?)
    }

    async fn create_event(&self, new_event: NewEvent) -> Result<Event, CalendarError> {
        let series = self.service.create_and_share_event(new_event).await?;
        Ok(series.parent)
    }

    async fn get_event(&self, id: &str) -> Result<Event, CalendarError> {
        let id = parse_id("id", id)?;
        Ok(self.service.get_event_by_id(id).await?)
    }

    async fn update_event(&self, id: &str, update: EventUpdate) -> Result<Event, CalendarError> {
        let id = parse_id("id", id)?;
        Ok(self.service.update_and_share_event(id, update).await?)
    }

    async fn delete_event(&self, id: &str) -> Result<String, CalendarError> {
        let id = parse_id("id", id)?;
        Ok(self.service.delete_event(id).await?)
    }

    async fn delete_event_for_user(
        &self,
        user_id: &str,
        event_id: &str,
    ) -> Result<String, CalendarError> {
        let user_id = parse_id("user_id", user_id)?;
        let event_id = parse_id("event_id", event_id)?;
        Ok(self.service.delete_event_for_user(user_id, event_id).await?)
    }

    async fn get_schedule(&self, id: &str) -> Result<ScheduleView, CalendarError> {
        let id = parse_id("id", id)?;
        Ok(self.service.get_schedule_by_id(id).await?)
    }

    async fn add_event_to_schedule(
        &self,
        user_id: &str,
        event_id: &str,
        membership: Membership,
    ) -> Result<(), CalendarError> {
        let user_id = parse_id("user_id", user_id)?;
        let event_id = parse_id("event_id", event_id)?;
        Ok(self
            .service
            .add_event_to_schedule_by_user_id(user_id, event_id, membership)
            .await?)
    }

    async fn remove_event_from_schedule(
        &self,
        user_id: &str,
        event_id: &str,
    ) -> Result<(), CalendarError> {
        let user_id = parse_id("user_id", user_id)?;
        let event_id = parse_id("event_id", event_id)?;
        Ok(self
            .service
            .delete_event_from_schedule(user_id, event_id)
            .await?)
    }

    async fn create_notification(
        &self,
        recipient: &str,
        kind: &str,
        message: &str,
        reminder_time: DateTime<Utc>,
    ) -> Result<Notification, CalendarError> {
        let recipient = parse_id("recipient", recipient)?;
        Ok(self
            .service
            .create_notification(recipient, kind, message, reminder_time)
            .await?)
    }

    async fn get_notifications(&self, user_id: &str) -> Result<Vec<Notification>, CalendarError> {
        let user_id = parse_id("user_id", user_id)?;
        Ok(self.service.get_notifications_by_user_id(user_id).await?)
    }
}
