use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::contract::model::{
    notification_kind, Event, EventUpdate, Membership, NewEvent, NewUser, Notification, Recipient,
    ScheduleView, User, UserOverview,
};
use crate::domain::error::DomainError;
use crate::domain::event_engine::{EventEngine, EventSeries};
use crate::domain::events::CalendarDomainEvent;
use crate::domain::notifications::NotificationStore;
use crate::domain::ports::{Clock, EventPublisher, ReconciliationSink};
use crate::domain::repo::{
    EventsRepository, NotificationsRepository, SchedulesRepository, UsersRepository,
};
use crate::domain::saga::Saga;
use crate::domain::schedules::ScheduleStore;
use crate::domain::users::UserDirectory;

/// Domain-level knobs. Built from `CalendarConfig` by the module.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub title_max_len: usize,
    pub description_max_len: usize,
    pub location_max_len: usize,
    pub max_occurrences: u32,
    pub max_reminder_minutes: i64,
    pub schedule_title: String,
    /// Attach recurrence successors to participants' schedules on create.
    pub attach_recurrences: bool,
    /// Queue an "Event Reminder" per participant and occurrence on create.
    pub schedule_event_reminders: bool,
    /// Deleting a recurring parent through `delete_event_for_user` removes its successors too.
    pub cascade_series_delete: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            title_max_len: 30,
            description_max_len: 300,
            location_max_len: 30,
            max_occurrences: 520,
            max_reminder_minutes: 10_080,
            schedule_title: "My Schedule".to_string(),
            attach_recurrences: true,
            schedule_event_reminders: true,
            cascade_series_delete: false,
        }
    }
}

/// Storage and side-channel handles the service is built from.
#[derive(Clone)]
pub struct ServicePorts {
    pub users: Arc<dyn UsersRepository>,
    pub events: Arc<dyn EventsRepository>,
    pub schedules: Arc<dyn SchedulesRepository>,
    pub notifications: Arc<dyn NotificationsRepository>,
    pub clock: Arc<dyn Clock>,
    pub publisher: Arc<dyn EventPublisher<CalendarDomainEvent>>,
    pub repairs: Arc<dyn ReconciliationSink>,
}

/// Facade over the calendar components, including the multi-document flows
/// that route handlers used to sequence by hand.
#[derive(Clone)]
pub struct CalendarService {
    directory: UserDirectory,
    engine: EventEngine,
    schedules: ScheduleStore,
    notifications: NotificationStore,
    repairs: Arc<dyn ReconciliationSink>,
    clock: Arc<dyn Clock>,
    config: ServiceConfig,
}

impl CalendarService {
    pub fn new(ports: ServicePorts, config: ServiceConfig) -> Self {
        let schedules = ScheduleStore::new(
            ports.schedules.clone(),
            ports.users.clone(),
            ports.events.clone(),
            config.schedule_title.clone(),
        );
        let notifications = NotificationStore::new(ports.notifications, ports.clock.clone());
        let directory = UserDirectory::new(
            ports.users.clone(),
            schedules.clone(),
            ports.publisher.clone(),
            ports.repairs.clone(),
            ports.clock.clone(),
        );
        let engine = EventEngine::new(
            ports.events,
            ports.users,
            ports.schedules,
            directory.clone(),
            notifications.clone(),
            ports.publisher,
            ports.repairs.clone(),
            ports.clock.clone(),
            config.clone(),
        );

        Self {
            directory,
            engine,
            schedules,
            notifications,
            repairs: ports.repairs,
            clock: ports.clock,
            config,
        }
    }

    pub fn directory(&self) -> &UserDirectory {
        &self.directory
    }

    pub fn engine(&self) -> &EventEngine {
        &self.engine
    }

    pub fn schedules(&self) -> &ScheduleStore {
        &self.schedules
    }

    pub fn notifications(&self) -> &NotificationStore {
        &self.notifications
    }

    // --- users -----------------------------------------------------------------

    pub async fn register_user(&self, new_user: NewUser) -> Result<User, DomainError> {
        self.directory.register_user(new_user).await
    }

    pub async fn get_user_by_id(&self, id: Uuid) -> Result<User, DomainError> {
        self.directory.get_user_by_id(id).await
    }

    pub async fn get_id_from_email(&self, email: &str) -> Result<Uuid, DomainError> {
        self.directory.get_id_from_email(email).await
    }

    pub async fn list_users_with_schedules(&self) -> Result<Vec<UserOverview>, DomainError> {
        self.directory.list_users_with_schedules().await
    }

    // --- events ----------------------------------------------------------------

    /// Create an event and fan it out: creator and recipients get it on their
    /// schedules, successors follow when enabled, and reminders are queued.
    ///
    /// Once the event record exists the call succeeds; a failed attachment or
    /// reminder is recorded as a repair.
    #[instrument(
        name = "calendar.service.create_and_share",
        skip(self, new_event),
        fields(created_by = %new_event.created_by)
    )]
    pub async fn create_and_share_event(&self, new_event: NewEvent) -> Result<EventSeries, DomainError> {
        let series = self.engine.create_event_series(new_event).await?;
        let parent = &series.parent;

        let mut saga = Saga::new(
            "create_and_share_event",
            parent.id,
            self.repairs.clone(),
            self.clock.clone(),
        );

        let attached: Vec<&Event> = if self.config.attach_recurrences {
            series.all().collect()
        } else {
            vec![parent]
        };
        for event in &attached {
            saga.step(
                "attach_creator",
                self.schedules.add_event_to_schedule_by_user_id(
                    event.created_by,
                    event.id,
                    Membership::Created,
                ),
            )
            .await;
            for recipient in &event.shared_with {
                saga.step(
                    "attach_recipient",
                    self.schedules.add_event_to_schedule_by_user_id(
                        *recipient,
                        event.id,
                        Membership::Shared,
                    ),
                )
                .await;
            }
        }

        if self.config.schedule_event_reminders {
            for event in series.all() {
                let message = reminder_message(event);
                for participant in event.participants() {
                    saga.step(
                        "schedule_reminder",
                        self.notifications.create_notification(
                            participant,
                            notification_kind::EVENT_REMINDER,
                            &message,
                            event.reminder_time(),
                        ),
                    )
                    .await;
                }
            }
        }

        info!(
            event_id = %parent.id,
            attached = attached.len(),
            repairs = saga.failures(),
            "Event shared"
        );
        Ok(series)
    }

    pub async fn create_event(&self, new_event: NewEvent) -> Result<Event, DomainError> {
        self.engine.create_event(new_event).await
    }

    pub async fn get_event_by_id(&self, id: Uuid) -> Result<Event, DomainError> {
        self.engine.get_event_by_id(id).await
    }

    pub async fn update_event(&self, id: Uuid, update: EventUpdate) -> Result<Event, DomainError> {
        self.engine.update_event(id, update).await
    }

    /// Update an event and attach it to the schedule of every recipient the
    /// update added. Recipients already on the event are left as they are.
    #[instrument(
        name = "calendar.service.update_and_share",
        skip(self, update),
        fields(event_id = %id)
    )]
    pub async fn update_and_share_event(
        &self,
        id: Uuid,
        update: EventUpdate,
    ) -> Result<Event, DomainError> {
        let before = self.engine.get_event_by_id(id).await?;
        let updated = self.engine.update_event(id, update).await?;

        let mut saga = Saga::new(
            "update_and_share_event",
            id,
            self.repairs.clone(),
            self.clock.clone(),
        );
        let added: Vec<Uuid> = updated
            .shared_with
            .iter()
            .copied()
            .filter(|r| !before.shared_with.contains(r))
            .collect();
        for recipient in &added {
            saga.step(
                "attach_recipient",
                self.schedules
                    .add_event_to_schedule_by_user_id(*recipient, id, Membership::Shared),
            )
            .await;
        }

        info!(added = added.len(), repairs = saga.failures(), "Event re-shared");
        Ok(updated)
    }

    pub async fn delete_event(&self, id: Uuid) -> Result<String, DomainError> {
        self.engine.delete_event(id).await
    }

    pub async fn delete_event_series(&self, parent_id: Uuid) -> Result<Vec<Event>, DomainError> {
        self.engine.delete_event_series(parent_id).await
    }

    /// Delete on behalf of `user_id`: remove the event and tell them it is gone.
    ///
    /// The delete already pulls the event from every schedule, the user's included.
    #[instrument(
        name = "calendar.service.delete_for_user",
        skip(self),
        fields(user_id = %user_id, event_id = %event_id)
    )]
    pub async fn delete_event_for_user(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<String, DomainError> {
        self.directory.get_user_by_id(user_id).await?;
        let event = self.engine.get_event_by_id(event_id).await?;

        let cascade = self.config.cascade_series_delete
            && event.is_recurring
            && event.original_event_id.is_none();
        let message = if cascade {
            let removed = self.engine.delete_event_series(event_id).await?;
            format!(
                "The event {} and {} later occurrences have been deleted",
                event.title,
                removed.len().saturating_sub(1)
            )
        } else {
            self.engine.delete_event(event_id).await?
        };

        let mut saga = Saga::new(
            "delete_event_for_user",
            event_id,
            self.repairs.clone(),
            self.clock.clone(),
        );
        saga.step(
            "notify_deleted",
            self.notifications
                .notify_now(user_id, notification_kind::EVENT_DELETED, &message),
        )
        .await;

        Ok(message)
    }

    // --- schedules -------------------------------------------------------------

    pub async fn create_schedule(&self) -> Result<Uuid, DomainError> {
        self.schedules.create_schedule().await
    }

    pub async fn get_schedule_by_id(&self, id: Uuid) -> Result<ScheduleView, DomainError> {
        self.schedules.get_schedule_by_id(id).await
    }

    pub async fn add_event_to_schedule_by_user_id(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        membership: Membership,
    ) -> Result<(), DomainError> {
        self.schedules
            .add_event_to_schedule_by_user_id(user_id, event_id, membership)
            .await
    }

    pub async fn delete_event_from_schedule(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<(), DomainError> {
        self.schedules
            .delete_event_from_schedule(user_id, event_id)
            .await
    }

    // --- notifications ---------------------------------------------------------

    pub async fn create_notification(
        &self,
        recipient: Uuid,
        kind: &str,
        message: &str,
        reminder_time: DateTime<Utc>,
    ) -> Result<Notification, DomainError> {
        self.notifications
            .create_notification(recipient, kind, message, reminder_time)
            .await
    }

    pub async fn get_notification_by_id(&self, id: Uuid) -> Result<Notification, DomainError> {
        self.notifications.get_notification_by_id(id).await
    }

    pub async fn get_notifications_by_user_id(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Notification>, DomainError> {
        self.notifications.get_notifications_by_user_id(user_id).await
    }

    /// Resolve an id-or-email recipient to a user id.
    pub async fn resolve_recipient(&self, recipient: &Recipient) -> Result<Uuid, DomainError> {
        self.directory.resolve_recipient(recipient).await
    }
}

fn reminder_message(event: &Event) -> String {
    format!(
        "Reminder: \"{}\" starts at {} in {}.",
        event.title,
        event.start_time.format("%Y-%m-%d %H:%M UTC"),
        event.location
    )
}
