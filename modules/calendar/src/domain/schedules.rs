use std::sync::Arc;

use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::contract::model::{Membership, Schedule, ScheduleView, ScheduledEvent};
use crate::domain::error::DomainError;
use crate::domain::repo::{EventsRepository, SchedulesRepository, UsersRepository};

/// One schedule per user: an ordered list of event references.
#[derive(Clone)]
pub struct ScheduleStore {
    schedules: Arc<dyn SchedulesRepository>,
    users: Arc<dyn UsersRepository>,
    events: Arc<dyn EventsRepository>,
    title: String,
}

impl ScheduleStore {
    pub fn new(
        schedules: Arc<dyn SchedulesRepository>,
        users: Arc<dyn UsersRepository>,
        events: Arc<dyn EventsRepository>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            schedules,
            users,
            events,
            title: title.into(),
        }
    }

    /// Create an empty schedule. Called once per registration.
    #[instrument(name = "calendar.schedules.create", skip(self))]
    pub async fn create_schedule(&self) -> Result<Uuid, DomainError> {
        let schedule = Schedule {
            id: Uuid::new_v4(),
            title: self.title.clone(),
            events: Vec::new(),
        };
        let id = schedule.id;
        self.schedules.insert(schedule).await?;
        debug!(schedule_id = %id, "schedule created");
        Ok(id)
    }

    /// Compensation for a registration that failed after its schedule was created.
    pub(crate) async fn discard_schedule(&self, id: Uuid) -> anyhow::Result<bool> {
        self.schedules.delete(id).await
    }

    /// Append `event_id` to the user's schedule and to the matching membership index.
    ///
    /// Two single-document writes, schedule first. Appending is not idempotent:
    /// each call is one logical attachment.
    #[instrument(
        name = "calendar.schedules.add_event",
        skip(self),
        fields(user_id = %user_id, event_id = %event_id, membership = ?membership)
    )]
    pub async fn add_event_to_schedule_by_user_id(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        membership: Membership,
    ) -> Result<(), DomainError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(user_id))?;

        if !self.schedules.push_event(user.schedule, event_id).await? {
            return Err(DomainError::schedule_not_found(user.schedule));
        }
        if !self
            .users
            .push_membership(user_id, membership, event_id)
            .await?
        {
            return Err(DomainError::user_not_found(user_id));
        }

        debug!("event attached to schedule");
        Ok(())
    }

    /// Populated view of a schedule. References that no longer resolve are left out.
    #[instrument(name = "calendar.schedules.get", skip(self), fields(schedule_id = %id))]
    pub async fn get_schedule_by_id(&self, id: Uuid) -> Result<ScheduleView, DomainError> {
        let schedule = self
            .schedules
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::schedule_not_found(id))?;

        let events = self.events.find_many(&schedule.events).await?;
        let dropped = schedule.events.len().saturating_sub(events.len());
        if dropped > 0 {
            debug!(dropped, "skipped dangling event references");
        }

        Ok(ScheduleView {
            id: schedule.id,
            title: schedule.title,
            events: events.iter().map(ScheduledEvent::from).collect(),
        })
    }

    /// Empty view used when a user's schedule record is missing.
    pub(crate) fn empty_view(&self, id: Uuid) -> ScheduleView {
        ScheduleView {
            id,
            title: self.title.clone(),
            events: Vec::new(),
        }
    }

    /// Pull `event_id` from the user's schedule. Already absent counts as success.
    #[instrument(
        name = "calendar.schedules.remove_event",
        skip(self),
        fields(user_id = %user_id, event_id = %event_id)
    )]
    pub async fn delete_event_from_schedule(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<(), DomainError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(user_id))?;

        if !self.schedules.pull_event(user.schedule, event_id).await? {
            return Err(DomainError::schedule_not_found(user.schedule));
        }

        info!("event removed from schedule");
        Ok(())
    }
}
