//! Recurrence expansion: one recurring parent → N independent successor events.
//!
//! Successor `i` (1-based) is the parent shifted by `i` whole periods. Each
//! offset is computed from the parent, never from the previous successor, so
//! a month clamp (Jan 31 → Feb 28) does not leak into later occurrences.
//! Only the start is shifted; the end keeps the parent's duration, so a
//! clamped start can never land on or after its end.

use chrono::{DateTime, Duration, Months, Utc};
use uuid::Uuid;

use crate::contract::model::{Event, RecurrenceFrequency};
use crate::domain::error::DomainError;

/// Shift `t` forward by `periods` increments of `frequency`.
///
/// Weekly adds 7 calendar days per period. Monthly adds calendar months with
/// chrono's rules (day-of-month clamped to the target month's length).
/// Returns `None` if the result is out of range or the frequency does not recur.
pub fn shift(t: DateTime<Utc>, frequency: RecurrenceFrequency, periods: u32) -> Option<DateTime<Utc>> {
    match frequency {
        RecurrenceFrequency::Weekly => {
            let days = i64::from(periods).checked_mul(7)?;
            t.checked_add_signed(Duration::try_days(days)?)
        }
        RecurrenceFrequency::Monthly => t.checked_add_months(Months::new(periods)),
        RecurrenceFrequency::NotApplicable => None,
    }
}

/// Build the `count` successors of `parent`.
///
/// Every non-temporal field is copied verbatim; each successor gets a fresh id
/// and `original_event_id = parent.id`. Nothing is persisted here.
pub fn expand(parent: &Event, count: u32) -> Result<Vec<Event>, DomainError> {
    let duration = parent.end_time - parent.start_time;
    if parent.recurrence_frequency == RecurrenceFrequency::NotApplicable {
        return Err(DomainError::validation(
            "recurrence_frequency",
            "cannot expand an event that does not recur",
        ));
    }

    (1..=count)
        .map(|i| {
            let start_time = shift(parent.start_time, parent.recurrence_frequency, i);
            let end_time = start_time.and_then(|s| s.checked_add_signed(duration));
            let (Some(start_time), Some(end_time)) = (start_time, end_time) else {
                return Err(DomainError::validation(
                    "number_of_occurrences",
                    format!("occurrence {i} falls outside the supported date range"),
                ));
            };
            Ok(Event {
                id: Uuid::new_v4(),
                start_time,
                end_time,
                original_event_id: Some(parent.id),
                ..parent.clone()
            })
        })
        .collect()
}
