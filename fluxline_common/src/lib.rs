/// Nanosecond-resolution UTC date time.
pub mod date_time;

/// Timestamp precision tags and scaling.
pub mod precision;

pub use date_time::{DateTimeError, NanoDateTime};
pub use precision::{Precision, PrecisionError};
