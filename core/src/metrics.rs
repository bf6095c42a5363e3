//! Business metrics for the ticket shop.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! binary installs a recorder (the server installs a Prometheus exporter).
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `ticketbooth_registrations_total` - Users registered
//! - `ticketbooth_checkouts_total{status}` - Checkouts started or failed at the provider
//! - `ticketbooth_reconciliations_total{outcome}` - Reconciliations by outcome
//!   (`issued`, `already_reconciled`, `rejected`, `unconfirmed`)
//! - `ticketbooth_tickets_issued_total` - Tickets written to the store
//! - `ticketbooth_payments_unfulfilled_total` - Captured payments without
//!   tickets (refund or retry needed)
//!
//! ## Gauges
//! - `ticketbooth_tickets_remaining` - Last observed `capacity - issued`

use crate::reconciliation::ReconciliationOutcome;
use metrics::{describe_counter, describe_gauge};

/// Register metric descriptions.
///
/// Call once at startup, after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "ticketbooth_registrations_total",
        "Total number of users registered"
    );
    describe_counter!(
        "ticketbooth_checkouts_total",
        "Total number of checkouts by status (started, failed)"
    );
    describe_counter!(
        "ticketbooth_reconciliations_total",
        "Total number of payment reconciliations by outcome"
    );
    describe_counter!(
        "ticketbooth_tickets_issued_total",
        "Total number of ticket tokens issued"
    );
    describe_counter!(
        "ticketbooth_payments_unfulfilled_total",
        "Payments captured at the provider whose tickets were not issued"
    );
    describe_gauge!(
        "ticketbooth_tickets_remaining",
        "Tickets still available for sale"
    );

    tracing::info!("Business metrics registered");
}

/// Record a user registration.
pub fn record_registration(tickets: u32) {
    metrics::counter!("ticketbooth_registrations_total").increment(1);
    tracing::debug!(tickets, "Recorded registration metric");
}

/// Record a checkout created at the provider.
pub fn record_checkout_started() {
    metrics::counter!("ticketbooth_checkouts_total", "status" => "started").increment(1);
}

/// Record a checkout the provider refused or never answered.
pub fn record_checkout_failed() {
    metrics::counter!("ticketbooth_checkouts_total", "status" => "failed").increment(1);
}

/// Record a completed reconciliation.
pub fn record_reconciliation(outcome: ReconciliationOutcome) {
    metrics::counter!("ticketbooth_reconciliations_total", "outcome" => outcome.as_str())
        .increment(1);
    tracing::debug!(outcome = outcome.as_str(), "Recorded reconciliation metric");
}

/// Record a confirmed payment whose tickets didn't fit.
pub fn record_reconciliation_rejected() {
    metrics::counter!("ticketbooth_reconciliations_total", "outcome" => "rejected").increment(1);
}

/// Record a callback whose payment the provider didn't confirm.
pub fn record_payment_unconfirmed() {
    metrics::counter!("ticketbooth_reconciliations_total", "outcome" => "unconfirmed").increment(1);
}

/// Record a captured payment left without tickets.
pub fn record_payment_unfulfilled() {
    metrics::counter!("ticketbooth_payments_unfulfilled_total").increment(1);
}

/// Record tickets written by one reconciliation.
pub fn record_tickets_issued(count: usize) {
    metrics::counter!("ticketbooth_tickets_issued_total").increment(count as u64);
}

/// Publish the remaining-tickets gauge.
#[allow(clippy::cast_precision_loss)] // Capacities are far below 2^52
pub fn update_tickets_remaining(remaining: u64) {
    metrics::gauge!("ticketbooth_tickets_remaining").set(remaining as f64);
}
