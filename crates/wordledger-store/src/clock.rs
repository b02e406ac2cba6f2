// ABOUTME: Time source used for first_seen / last_seen stamps.
// ABOUTME: SystemClock reads the wall clock; tests substitute deterministic clocks.

use chrono::{DateTime, Utc};

/// Supplies "now" once per merged observation.
pub trait Clock: Send {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<F> Clock for F
where
    F: Fn() -> DateTime<Utc> + Send,
{
    fn now(&self) -> DateTime<Utc> {
        self()
    }
}
