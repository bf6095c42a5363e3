//! The ticket office: every service wired over one store and provider.
//!
//! Mirrors how the HTTP layer uses the core; one cheap-to-clone value holding
//! the ledger, registration, checkout, reconciliation and export services.

use crate::checkout::CheckoutService;
use crate::config::TicketConfig;
use crate::environment::Clock;
use crate::export::TicketExport;
use crate::ledger::InventoryLedger;
use crate::provider::PaymentProvider;
use crate::reconciliation::PaymentReconciler;
use crate::registration::RegistrationService;
use crate::store::TicketStore;
use std::sync::Arc;

/// All ticket services sharing one store.
#[derive(Clone)]
pub struct TicketOffice {
    store: Arc<dyn TicketStore>,
    config: TicketConfig,
    /// Inventory queries
    pub ledger: InventoryLedger,
    /// User registration
    pub registration: RegistrationService,
    /// Payment creation and confirmation checks
    pub checkout: CheckoutService,
    /// Payment-to-ticket reconciliation
    pub reconciler: PaymentReconciler,
    /// Ticket download
    pub export: TicketExport,
}

impl TicketOffice {
    /// Wire every service.
    #[must_use]
    pub fn new(
        store: Arc<dyn TicketStore>,
        provider: Arc<dyn PaymentProvider>,
        config: TicketConfig,
        clock: Arc<dyn Clock>,
        verify_confirmations: bool,
    ) -> Self {
        let ledger = InventoryLedger::new(Arc::clone(&store), config.capacity);
        let registration = RegistrationService::new(
            Arc::clone(&store),
            ledger.clone(),
            Arc::clone(&clock),
            config.max_tickets_per_order,
        );
        let checkout = CheckoutService::new(
            Arc::clone(&store),
            provider,
            &config,
            verify_confirmations,
        );
        let reconciler = PaymentReconciler::from_config(Arc::clone(&store), &config, clock);
        let export = TicketExport::new(Arc::clone(&store));

        Self {
            store,
            config,
            ledger,
            registration,
            checkout,
            reconciler,
            export,
        }
    }

    /// Sale configuration
    #[must_use]
    pub const fn config(&self) -> &TicketConfig {
        &self.config
    }

    /// Underlying store
    #[must_use]
    pub fn store(&self) -> &Arc<dyn TicketStore> {
        &self.store
    }
}
