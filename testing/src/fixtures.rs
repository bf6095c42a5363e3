//! Sample registrations and users.

use crate::test_clock;
use ticketbooth_core::types::{Registration, User, UserId};
use ticketbooth_core::Clock;

/// A valid registration for `tickets` tickets.
#[must_use]
pub fn registration(tickets: u32) -> Registration {
    Registration {
        title: "Ms".to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        phone_number: "020 7946 0000".to_string(),
        age: 36,
        gender: "Female".to_string(),
        number_of_tickets: tickets,
        address1: "12 St James's Square".to_string(),
        address2: None,
        city: "London".to_string(),
        post_code: "SW1Y 4JH".to_string(),
    }
}

/// A registered user holding `tickets` tickets, with a fresh id.
#[must_use]
pub fn user(tickets: u32) -> User {
    User::from_registration(UserId::new(), registration(tickets), test_clock().now())
}
