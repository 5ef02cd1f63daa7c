use chrono::{DateTime, Utc};

/// Where "now" comes from
///
/// SSDP cache expiry is computed against the wall clock; injecting
/// it lets the parsing tests pin time to a known instant.
pub trait Clock {
    /// The current UTC time
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
