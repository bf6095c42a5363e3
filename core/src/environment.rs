//! Injected dependencies that are not storage or payments.

use chrono::{DateTime, Utc};

/// Clock trait - abstracts time operations for testability
///
/// Production uses [`SystemClock`]; tests use a fixed clock so issued-at
/// timestamps are deterministic.
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
