pub mod dispatcher;
pub mod error;
pub mod event_engine;
pub mod events;
pub mod notifications;
pub mod ports;
pub mod recurrence;
pub mod repo;
pub(crate) mod saga;
pub mod schedules;
pub mod service;
pub mod users;
pub mod validation;
