pub mod local;

pub use local::CalendarLocalClient;
