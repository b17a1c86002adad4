use parking_lot::Mutex;

use crate::domain::ports::{Repair, ReconciliationSink};

/// Repairs kept in memory until someone drains them.
#[derive(Debug, Default)]
pub struct InMemoryRepairQueue {
    pending: Mutex<Vec<Repair>>,
}

impl InMemoryRepairQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the queued repairs, oldest first.
    pub fn pending(&self) -> Vec<Repair> {
        self.pending.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Take every queued repair, leaving the queue empty.
    pub fn drain(&self) -> Vec<Repair> {
        std::mem::take(&mut *self.pending.lock())
    }
}

impl ReconciliationSink for InMemoryRepairQueue {
    fn record(&self, repair: Repair) {
        self.pending.lock().push(repair);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn drain_empties_the_queue() {
        let queue = InMemoryRepairQueue::new();
        queue.record(Repair {
            flow: "delete_event",
            step: "pull_schedules",
            subject: Uuid::new_v4(),
            detail: "store unavailable".into(),
            at: Utc::now(),
        });

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.drain().len(), 1);
        assert!(queue.is_empty());
    }
}
