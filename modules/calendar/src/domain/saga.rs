use std::future::Future;
use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::domain::ports::{Clock, Repair, ReconciliationSink};

/// Runs the follow-up steps of a flow whose primary write already committed.
///
/// A failing step is logged, recorded as a [`Repair`] and skipped; the flow
/// carries on with the next step. Callers read [`Saga::failures`] at the end.
pub(crate) struct Saga {
    flow: &'static str,
    subject: Uuid,
    sink: Arc<dyn ReconciliationSink>,
    clock: Arc<dyn Clock>,
    failures: usize,
}

impl Saga {
    pub(crate) fn new(
        flow: &'static str,
        subject: Uuid,
        sink: Arc<dyn ReconciliationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            flow,
            subject,
            sink,
            clock,
            failures: 0,
        }
    }

    pub(crate) async fn step<T, E, F>(&mut self, step: &'static str, fut: F) -> Option<T>
    where
        F: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        match fut.await {
            Ok(value) => Some(value),
            Err(e) => {
                self.fail(step, format!("{e:#}"));
                None
            }
        }
    }

    /// Record a failure detected without a fallible call (e.g. zero matched documents).
    pub(crate) fn fail(&mut self, step: &'static str, detail: impl Into<String>) {
        let detail = detail.into();
        warn!(
            flow = self.flow,
            step,
            subject = %self.subject,
            error = %detail,
            "follow-up step failed; queued for reconciliation"
        );
        self.sink.record(Repair {
            flow: self.flow,
            step,
            subject: self.subject,
            detail,
            at: self.clock.now(),
        });
        self.failures += 1;
    }

    pub(crate) fn failures(&self) -> usize {
        self.failures
    }
}
