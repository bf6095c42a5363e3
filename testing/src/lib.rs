//! # Ticketbooth Testing
//!
//! Test doubles and fixtures for the Ticketbooth crates.
//!
//! This crate provides:
//! - [`InMemoryTicketStore`]: a `TicketStore` with a real serialized issuance
//!   scope and failure injection
//! - [`MockPaymentProvider`]: a `PaymentProvider` that records calls
//! - [`FixedClock`]: deterministic time
//! - [`fixtures`] and [`properties`]: sample data and proptest strategies
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use ticketbooth_core::{TicketConfig, TicketOffice};
//! use ticketbooth_testing::{fixtures, test_clock, InMemoryTicketStore, MockPaymentProvider};
//!
//! # tokio_test::block_on(async {
//! let office = TicketOffice::new(
//!     Arc::new(InMemoryTicketStore::new()),
//!     Arc::new(MockPaymentProvider::new()),
//!     TicketConfig::default(),
//!     Arc::new(test_clock()),
//!     true,
//! );
//!
//! let user = office.registration.register(fixtures::registration(2)).await.unwrap();
//! assert_eq!(user.number_of_tickets, 2);
//! # });
//! ```

pub mod fixtures;
pub mod properties;
mod provider;
mod store;

pub use provider::MockPaymentProvider;
pub use store::InMemoryTicketStore;

use chrono::{DateTime, Utc};
use ticketbooth_core::environment::Clock;

/// Fixed clock for deterministic tests
///
/// Always returns the same time, making tests reproducible.
///
/// # Example
///
/// ```
/// use ticketbooth_testing::FixedClock;
/// use ticketbooth_core::Clock;
/// use chrono::Utc;
///
/// let clock = FixedClock::new(Utc::now());
/// assert_eq!(clock.now(), clock.now());
/// ```
#[derive(Debug, Clone)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    /// Create a new fixed clock with the given time
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

/// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
///
/// # Panics
///
/// Never in practice: the timestamp is hardcoded.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_clock() -> FixedClock {
    FixedClock::new(
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc),
    )
}
