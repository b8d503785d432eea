pub mod appointment;
pub mod doctor;
pub mod enums;
pub mod filters;
pub mod patient;

pub use appointment::*;
pub use doctor::*;
pub use enums::*;
pub use filters::*;
pub use patient::*;

use chrono::{Local, NaiveDateTime, Timelike};

/// Storage format for record timestamps (second precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time truncated to the stored precision, so freshly built
/// records compare equal to their persisted copies.
pub fn now_timestamp() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}
