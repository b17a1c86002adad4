#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use calendar::config::CalendarConfig;
use calendar::contract::client::CalendarApi;
use calendar::contract::model::{NewEvent, NewUser, Recipient, User};
use calendar::domain::service::CalendarService;
use calendar::infra::clock::ManualClock;
use calendar::infra::delivery::LogDelivery;
use calendar::infra::publisher::TracingEventPublisher;
use calendar::infra::reconcile::InMemoryRepairQueue;
use calendar::infra::storage::InMemoryStore;
use calendar::{CalendarDeps, CalendarModule};

/// Fixed starting instant for every test clock.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 7, 9, 0, 0).unwrap()
}

/// A module over one in-memory store with a manual clock and an inspectable repair queue.
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub clock: Arc<ManualClock>,
    pub repairs: Arc<InMemoryRepairQueue>,
    pub module: CalendarModule,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(CalendarConfig::default())
    }

    pub fn with_config(config: CalendarConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let deps = CalendarDeps {
            users: store.clone(),
            events: store.clone(),
            schedules: store.clone(),
            notifications: store.clone(),
            ..Self::base_deps()
        };
        Self::from_parts(store, config, deps)
    }

    /// Side channels shared by every harness; storage is filled in by the caller.
    pub fn base_deps() -> CalendarDeps {
        CalendarDeps::in_memory()
    }

    /// Build a harness around caller-provided deps. The clock, delivery,
    /// publisher and repair queue are always replaced by test doubles.
    pub fn from_parts(store: Arc<InMemoryStore>, config: CalendarConfig, deps: CalendarDeps) -> Self {
        let clock = Arc::new(ManualClock::new(epoch()));
        let repairs = Arc::new(InMemoryRepairQueue::new());
        let deps = CalendarDeps {
            clock: clock.clone(),
            delivery: Arc::new(LogDelivery),
            publisher: Arc::new(TracingEventPublisher),
            repairs: repairs.clone(),
            ..deps
        };
        let module =
            CalendarModule::with_instance(config, deps, "test-0").expect("valid test config");
        Self {
            store,
            clock,
            repairs,
            module,
        }
    }

    pub fn service(&self) -> Arc<CalendarService> {
        self.module.service()
    }

    pub fn api(&self) -> Arc<dyn CalendarApi> {
        self.module.api()
    }

    pub async fn register(&self, first_name: &str, email: &str) -> User {
        self.service()
            .register_user(new_user(first_name, email))
            .await
            .expect("register user")
    }
}

pub fn new_user(first_name: &str, email: &str) -> NewUser {
    NewUser {
        first_name: first_name.to_string(),
        last_name: "Tester".to_string(),
        email: email.to_string(),
        credential_hash: "$2b$10$abcdefghijklmnopqrstuv".to_string(),
        timezone: "EST".to_string(),
        role: "user".to_string(),
    }
}

/// One-hour, one-off event starting `lead` after the harness epoch.
pub fn new_event(created_by: Uuid, lead: Duration) -> NewEvent {
    let start = epoch() + lead;
    NewEvent {
        title: "Planning".to_string(),
        created_by,
        description: "Sprint planning".to_string(),
        start_time: start,
        end_time: start + Duration::hours(1),
        location: "Room 4".to_string(),
        reminder: 15,
        is_recurring: false,
        recurrence_frequency: None,
        shared_with: Vec::new(),
        number_of_occurrences: None,
    }
}

pub fn recurring(mut event: NewEvent, frequency: &str, occurrences: i64) -> NewEvent {
    event.is_recurring = true;
    event.recurrence_frequency = Some(frequency.to_string());
    event.number_of_occurrences = Some(occurrences);
    event
}

pub fn shared(mut event: NewEvent, with: &[&User]) -> NewEvent {
    event.shared_with = with.iter().map(|u| Recipient::Id(u.id)).collect();
    event
}
