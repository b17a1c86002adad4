use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::service::ServiceConfig;

/// Calendar module configuration (section `modules.calendar`).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CalendarConfig {
    #[serde(default = "default_title_max_len")]
    pub title_max_len: usize,
    #[serde(default = "default_description_max_len")]
    pub description_max_len: usize,
    #[serde(default = "default_location_max_len")]
    pub location_max_len: usize,
    /// Upper bound on `number_of_occurrences` for one recurring event.
    #[serde(default = "default_max_occurrences")]
    pub max_occurrences: u32,
    #[serde(default = "default_max_reminder_minutes")]
    pub max_reminder_minutes: i64,
    /// Interval between dispatcher ticks, e.g. "60s" or "1m".
    #[serde(default = "default_dispatcher_tick", with = "humantime_serde")]
    pub dispatcher_tick: Duration,
    #[serde(default = "default_schedule_title")]
    pub schedule_title: String,
    #[serde(default = "default_true")]
    pub attach_recurrences: bool,
    #[serde(default = "default_true")]
    pub schedule_event_reminders: bool,
    #[serde(default)]
    pub cascade_series_delete: bool,
}

fn default_title_max_len() -> usize {
    30
}

fn default_description_max_len() -> usize {
    300
}

fn default_location_max_len() -> usize {
    30
}

fn default_max_occurrences() -> u32 {
    520
}

fn default_max_reminder_minutes() -> i64 {
    10_080
}

fn default_dispatcher_tick() -> Duration {
    Duration::from_secs(60)
}

fn default_schedule_title() -> String {
    "My Schedule".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            title_max_len: default_title_max_len(),
            description_max_len: default_description_max_len(),
            location_max_len: default_location_max_len(),
            max_occurrences: default_max_occurrences(),
            max_reminder_minutes: default_max_reminder_minutes(),
            dispatcher_tick: default_dispatcher_tick(),
            schedule_title: default_schedule_title(),
            attach_recurrences: true,
            schedule_event_reminders: true,
            cascade_series_delete: false,
        }
    }
}

impl CalendarConfig {
    /// Reject settings the module cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.dispatcher_tick.is_zero() {
            anyhow::bail!("dispatcher_tick must be greater than zero");
        }
        if self.max_occurrences == 0 {
            anyhow::bail!("max_occurrences must be at least 1");
        }
        if self.max_reminder_minutes < 0 {
            anyhow::bail!("max_reminder_minutes must not be negative");
        }
        Ok(())
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            title_max_len: self.title_max_len,
            description_max_len: self.description_max_len,
            location_max_len: self.location_max_len,
            max_occurrences: self.max_occurrences,
            max_reminder_minutes: self.max_reminder_minutes,
            schedule_title: self.schedule_title.clone(),
            attach_recurrences: self.attach_recurrences,
            schedule_event_reminders: self.schedule_event_reminders,
            cascade_series_delete: self.cascade_series_delete,
        }
    }
}
