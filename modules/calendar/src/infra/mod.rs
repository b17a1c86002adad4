pub mod clock;
pub mod delivery;
pub mod publisher;
pub mod reconcile;
pub mod storage;
