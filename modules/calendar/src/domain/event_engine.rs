use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::contract::model::{
    notification_kind, Event, EventUpdate, Membership, NewEvent, RecurrenceFrequency,
};
use crate::domain::error::DomainError;
use crate::domain::events::CalendarDomainEvent;
use crate::domain::notifications::NotificationStore;
use crate::domain::ports::{Clock, EventPublisher, ReconciliationSink};
use crate::domain::recurrence;
use crate::domain::repo::{EventPatch, EventsRepository, SchedulesRepository, UsersRepository};
use crate::domain::saga::Saga;
use crate::domain::service::ServiceConfig;
use crate::domain::users::UserDirectory;
use crate::domain::validation;

/// A freshly created event and the successors generated from it.
#[derive(Debug, Clone)]
pub struct EventSeries {
    pub parent: Event,
    pub children: Vec<Event>,
}

impl EventSeries {
    /// Parent first, then successors in occurrence order.
    pub fn all(&self) -> impl Iterator<Item = &Event> {
        std::iter::once(&self.parent).chain(self.children.iter())
    }
}

/// Fields shared by create and update after validation and trimming.
struct EventFields {
    title: String,
    description: String,
    location: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    reminder: i64,
    recurrence_frequency: RecurrenceFrequency,
}

/// Authoring, mutation and deletion of events.
#[derive(Clone)]
pub struct EventEngine {
    events: Arc<dyn EventsRepository>,
    users: Arc<dyn UsersRepository>,
    schedules: Arc<dyn SchedulesRepository>,
    directory: UserDirectory,
    notifications: NotificationStore,
    publisher: Arc<dyn EventPublisher<CalendarDomainEvent>>,
    repairs: Arc<dyn ReconciliationSink>,
    clock: Arc<dyn Clock>,
    config: ServiceConfig,
}

impl EventEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        events: Arc<dyn EventsRepository>,
        users: Arc<dyn UsersRepository>,
        schedules: Arc<dyn SchedulesRepository>,
        directory: UserDirectory,
        notifications: NotificationStore,
        publisher: Arc<dyn EventPublisher<CalendarDomainEvent>>,
        repairs: Arc<dyn ReconciliationSink>,
        clock: Arc<dyn Clock>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            events,
            users,
            schedules,
            directory,
            notifications,
            publisher,
            repairs,
            clock,
            config,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn validate_fields(
        &self,
        title: &str,
        description: &str,
        location: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        reminder: i64,
        is_recurring: bool,
        recurrence_frequency: Option<&str>,
    ) -> Result<EventFields, DomainError> {
        let cfg = &self.config;
        let title = validation::bounded_text("title", title, 1, cfg.title_max_len)?;
        let description =
            validation::bounded_text("description", description, 1, cfg.description_max_len)?;
        let location = validation::bounded_text("location", location, 1, cfg.location_max_len)?;

        if start_time >= end_time {
            return Err(DomainError::validation(
                "end_time",
                "end time must be after start time",
            ));
        }
        if start_time < self.clock.now() {
            return Err(DomainError::validation(
                "start_time",
                "start time cannot be in the past",
            ));
        }

        let reminder = validation::reminder_minutes(reminder, cfg.max_reminder_minutes)?;
        let recurrence_frequency =
            validation::recurrence_frequency(is_recurring, recurrence_frequency)?;

        Ok(EventFields {
            title,
            description,
            location,
            start_time,
            end_time,
            reminder,
            recurrence_frequency,
        })
    }

    /// Create an event and, when it recurs, its successors.
    ///
    /// Nothing is attached to schedules here; see `CalendarService` for the fan-out.
    #[instrument(
        name = "calendar.events.create",
        skip(self, new_event),
        fields(created_by = %new_event.created_by, recurring = new_event.is_recurring)
    )]
    pub async fn create_event_series(&self, new_event: NewEvent) -> Result<EventSeries, DomainError> {
        info!("Creating event");

        let fields = self.validate_fields(
            &new_event.title,
            &new_event.description,
            &new_event.location,
            new_event.start_time,
            new_event.end_time,
            new_event.reminder,
            new_event.is_recurring,
            new_event.recurrence_frequency.as_deref(),
        )?;
        let occurrences = if new_event.is_recurring {
            validation::occurrence_count(new_event.number_of_occurrences, self.config.max_occurrences)?
        } else {
            0
        };

        let creator = self.directory.get_user_by_id(new_event.created_by).await?;
        let shared_with = self
            .directory
            .resolve_recipients(creator.id, &new_event.shared_with)
            .await?;

        let parent = Event {
            id: Uuid::new_v4(),
            title: fields.title,
            description: fields.description,
            start_time: fields.start_time,
            end_time: fields.end_time,
            location: fields.location,
            reminder: fields.reminder,
            is_recurring: new_event.is_recurring,
            recurrence_frequency: fields.recurrence_frequency,
            shared_with,
            created_by: creator.id,
            original_event_id: None,
        };
        // Expanded before anything is written so a range error leaves no trace.
        let children = if occurrences > 0 {
            recurrence::expand(&parent, occurrences)?
        } else {
            Vec::new()
        };

        self.events.insert(parent.clone()).await?;

        let mut written: Vec<Uuid> = Vec::with_capacity(children.len());
        for child in &children {
            if let Err(e) = self.events.insert(child.clone()).await {
                self.discard_partial_series(parent.id, &written).await;
                return Err(DomainError::from(e));
            }
            written.push(child.id);
        }

        self.publisher.publish(&CalendarDomainEvent::EventCreated {
            id: parent.id,
            children: occurrences,
            at: self.clock.now(),
        });
        info!(event_id = %parent.id, children = occurrences, "Event created");
        Ok(EventSeries { parent, children })
    }

    /// Single-record view of [`create_event_series`](Self::create_event_series).
    pub async fn create_event(&self, new_event: NewEvent) -> Result<Event, DomainError> {
        self.create_event_series(new_event).await.map(|s| s.parent)
    }

    async fn discard_partial_series(&self, parent: Uuid, children: &[Uuid]) {
        let mut saga = Saga::new("create_event", parent, self.repairs.clone(), self.clock.clone());
        for id in children.iter().rev() {
            saga.step("discard_child", self.events.delete(*id)).await;
        }
        saga.step("discard_parent", self.events.delete(parent)).await;
    }

    #[instrument(name = "calendar.events.get", skip(self), fields(event_id = %id))]
    pub async fn get_event_by_id(&self, id: Uuid) -> Result<Event, DomainError> {
        debug!("Getting event by id");
        self.events
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::event_not_found(id))
    }

    /// Successors generated from `parent_id`.
    pub async fn get_recurrences(&self, parent_id: Uuid) -> Result<Vec<Event>, DomainError> {
        Ok(self.events.find_by_original(parent_id).await?)
    }

    /// Replace the event's fields and merge new recipients into `shared_with`.
    ///
    /// Recipients are only ever added. The merge happens inside the store as one
    /// single-document update, so concurrent updates cannot drop each other's recipients.
    #[instrument(name = "calendar.events.update", skip(self, update), fields(event_id = %id))]
    pub async fn update_event(&self, id: Uuid, update: EventUpdate) -> Result<Event, DomainError> {
        info!("Updating event");

        let fields = self.validate_fields(
            &update.title,
            &update.description,
            &update.location,
            update.start_time,
            update.end_time,
            update.reminder,
            update.is_recurring,
            update.recurrence_frequency.as_deref(),
        )?;

        let current = self.get_event_by_id(id).await?;
        let add_shared_with = self
            .directory
            .resolve_recipients(current.created_by, &update.shared_with)
            .await?;

        let patch = EventPatch {
            title: fields.title,
            description: fields.description,
            start_time: fields.start_time,
            end_time: fields.end_time,
            location: fields.location,
            reminder: fields.reminder,
            is_recurring: update.is_recurring,
            recurrence_frequency: fields.recurrence_frequency,
            add_shared_with,
        };
        let updated = self
            .events
            .apply_patch(id, patch)
            .await?
            .ok_or_else(|| DomainError::event_not_found(id))?;

        let mut saga = Saga::new("update_event", id, self.repairs.clone(), self.clock.clone());
        let message = format!("The event \"{}\" has been updated.", updated.title);
        for participant in updated.participants() {
            saga.step(
                "notify_participant",
                self.notifications
                    .notify_now(participant, notification_kind::EVENT_UPDATED, &message),
            )
            .await;
        }

        self.publisher.publish(&CalendarDomainEvent::EventUpdated {
            id,
            at: self.clock.now(),
        });
        info!(shared_with = updated.shared_with.len(), "Event updated");
        Ok(updated)
    }

    /// Delete one event and pull every reference to it.
    ///
    /// Successors of a recurring parent are left alone.
    #[instrument(name = "calendar.events.delete", skip(self), fields(event_id = %id))]
    pub async fn delete_event(&self, id: Uuid) -> Result<String, DomainError> {
        let event = self.remove_event(id).await?;
        Ok(format!("The event {} has been deleted", event.title))
    }

    /// Delete a recurring parent together with every successor pointing back at it.
    /// Returns the removed records, parent first.
    #[instrument(name = "calendar.events.delete_series", skip(self), fields(event_id = %parent_id))]
    pub async fn delete_event_series(&self, parent_id: Uuid) -> Result<Vec<Event>, DomainError> {
        let children = self.events.find_by_original(parent_id).await?;
        let parent = self.remove_event(parent_id).await?;

        let mut removed = Vec::with_capacity(children.len() + 1);
        removed.push(parent);
        for child in children {
            match self.remove_event(child.id).await {
                Ok(event) => removed.push(event),
                // Already gone: someone deleted that occurrence concurrently.
                Err(DomainError::EventNotFound { id }) => {
                    debug!(child_id = %id, "successor already deleted");
                }
                Err(e) => return Err(e),
            }
        }

        info!(removed = removed.len(), "Event series deleted");
        Ok(removed)
    }

    async fn remove_event(&self, id: Uuid) -> Result<Event, DomainError> {
        let event = self
            .events
            .delete(id)
            .await?
            .ok_or_else(|| DomainError::event_not_found(id))?;

        let mut saga = Saga::new("delete_event", id, self.repairs.clone(), self.clock.clone());
        if let Some(false) = saga
            .step(
                "pull_created",
                self.users
                    .pull_membership(event.created_by, Membership::Created, id),
            )
            .await
        {
            saga.fail("pull_created", format!("creator {} not found", event.created_by));
        }
        saga.step("pull_shared", self.users.pull_shared_everywhere(id))
            .await;
        saga.step("pull_schedules", self.schedules.pull_event_everywhere(id))
            .await;
        if saga.failures() > 0 {
            warn!(failures = saga.failures(), "event deleted with pending cleanup");
        }

        self.publisher.publish(&CalendarDomainEvent::EventDeleted {
            id,
            at: self.clock.now(),
        });
        info!(title = %event.title, "Event deleted");
        Ok(event)
    }
}
