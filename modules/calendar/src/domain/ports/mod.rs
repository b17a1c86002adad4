pub mod clock;
pub mod delivery;
pub mod reconcile;

pub use clock::Clock;
pub use delivery::NotificationDelivery;
pub use reconcile::{Repair, ReconciliationSink};

/// Output port: publish domain events (no knowledge of transport).
pub trait EventPublisher<E>: Send + Sync + 'static {
    fn publish(&self, event: &E);
}
