pub mod patient;
pub mod visit;

pub use patient::*;
pub use visit::*;

/// Storage format of visit timestamps.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Storage format of calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
