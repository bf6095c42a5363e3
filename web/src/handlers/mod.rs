//! HTTP handlers.

pub mod health;
pub mod payments;
pub mod registration;
pub mod tickets;
