//! System-level modules
//!
//! - Logging initialization
//! - Injectable clock

pub mod clock;
pub mod logging;

pub use clock::{Clock, FixedClock, SystemClock};
