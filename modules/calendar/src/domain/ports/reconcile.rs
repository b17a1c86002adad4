use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A step of a multi-document flow that failed after an earlier step committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repair {
    /// Flow the step belongs to, e.g. "delete_event".
    pub flow: &'static str,
    /// Step name, e.g. "pull_from_schedules".
    pub step: &'static str,
    /// Primary entity of the flow (the event being deleted, the user being registered, ...).
    pub subject: Uuid,
    pub detail: String,
    pub at: DateTime<Utc>,
}

/// Receives repairs for later reconciliation.
pub trait ReconciliationSink: Send + Sync {
    fn record(&self, repair: Repair);
}
