//! User registration.
//!
//! Validates the form, checks (advisorily) that the requested tickets are still
//! available, and persists the user. No tickets are reserved here: inventory
//! is only consumed when a payment is reconciled.

use crate::environment::Clock;
use crate::error::Result;
use crate::ledger::InventoryLedger;
use crate::store::TicketStore;
use crate::types::{Registration, User, UserId};
use std::sync::Arc;

/// Registers attendees.
#[derive(Clone)]
pub struct RegistrationService {
    store: Arc<dyn TicketStore>,
    ledger: InventoryLedger,
    clock: Arc<dyn Clock>,
    max_tickets_per_order: u32,
}

impl RegistrationService {
    /// Create a registration service
    #[must_use]
    pub fn new(
        store: Arc<dyn TicketStore>,
        ledger: InventoryLedger,
        clock: Arc<dyn Clock>,
        max_tickets_per_order: u32,
    ) -> Self {
        Self {
            store,
            ledger,
            clock,
            max_tickets_per_order,
        }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// - `Validation` if the form is invalid
    /// - `CapacityExceeded` if fewer tickets remain than requested
    /// - `StorageUnavailable` if the ticket count can't be read
    /// - `PersistFailed` if the user can't be saved
    pub async fn register(&self, registration: Registration) -> Result<User> {
        registration.validate(self.max_tickets_per_order)?;

        if let Err(e) = self.ledger.admit(registration.number_of_tickets).await {
            tracing::info!(
                requested = registration.number_of_tickets,
                error = %e,
                "Registration rejected"
            );
            return Err(e);
        }

        let user = User::from_registration(UserId::new(), registration, self.clock.now());
        self.store.insert_user(&user).await?;

        crate::metrics::record_registration(user.number_of_tickets);
        tracing::info!(
            user_id = %user.id,
            tickets = user.number_of_tickets,
            "User registered"
        );

        Ok(user)
    }
}
