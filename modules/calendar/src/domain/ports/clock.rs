use chrono::{DateTime, Utc};

/// Time source for "now" comparisons and due-time checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
