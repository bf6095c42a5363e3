//! Inventory ledger.
//!
//! Answers "how many tickets remain" and "can this request be admitted" from the
//! persisted ticket count. Read-only.
//!
//! Outside an issuance scope the answer is advisory: another payment may commit
//! right after the count is read. Registration uses it that way to give early
//! feedback; the binding check is repeated by the reconciler inside the scope.

use crate::error::Result;
use crate::store::TicketStore;
use crate::types::Capacity;
use std::sync::Arc;

/// Read-only view of ticket inventory.
#[derive(Clone)]
pub struct InventoryLedger {
    store: Arc<dyn TicketStore>,
    capacity: Capacity,
}

impl InventoryLedger {
    /// Create a ledger over `store`
    #[must_use]
    pub fn new(store: Arc<dyn TicketStore>, capacity: Capacity) -> Self {
        Self { store, capacity }
    }

    /// Configured capacity
    #[must_use]
    pub const fn capacity(&self) -> Capacity {
        self.capacity
    }

    /// Tickets issued so far.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the count can't be read.
    pub async fn issued(&self) -> Result<u64> {
        self.store.count_tokens().await
    }

    /// `capacity - issued`, never negative.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the count can't be read.
    pub async fn remaining(&self) -> Result<u64> {
        let issued = self.issued().await?;
        let remaining = self.capacity.remaining(issued);
        crate::metrics::update_tickets_remaining(remaining);
        Ok(remaining)
    }

    /// Whether `requested` tickets fit in what remains.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the count can't be read.
    pub async fn can_admit(&self, requested: u32) -> Result<bool> {
        Ok(u64::from(requested) <= self.remaining().await?)
    }

    /// Like [`can_admit`](Self::can_admit), reporting the shortfall on rejection.
    ///
    /// # Errors
    ///
    /// Returns `CapacityExceeded` if the request doesn't fit, or
    /// `StorageUnavailable` if the count can't be read.
    pub async fn admit(&self, requested: u32) -> Result<()> {
        let issued = self.issued().await?;
        crate::metrics::update_tickets_remaining(self.capacity.remaining(issued));
        self.capacity.admit(issued, requested)
    }
}
