// === PUBLIC CONTRACT ===
// Only the contract module should be used by callers (route layer, other modules)
pub mod contract;

pub use contract::{client, error, model};

// === MODULE DEFINITION ===
pub mod config;
pub mod module;
pub use module::{CalendarDeps, CalendarModule};

// === INTERNAL MODULES ===
// WARNING: These modules are internal implementation details!
// They are exposed only for comprehensive testing and for wiring custom stores.
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod gateways;
#[doc(hidden)]
pub mod infra;
