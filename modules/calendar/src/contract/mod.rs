pub mod client;
pub mod error;
pub mod model;

pub use client::CalendarApi;
pub use error::CalendarError;
pub use model::*;
