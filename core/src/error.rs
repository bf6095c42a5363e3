//! Error taxonomy for the ticketing workflow.

use crate::types::{PaymentId, UserId};
use thiserror::Error;

/// Result type alias for ticketing operations.
pub type Result<T> = std::result::Result<T, TicketingError>;

/// Every failure the ticketing workflow can report.
///
/// None of these are retried inside the core. A retry is always a fresh call
/// from the outside (a provider webhook redelivery, a browser refresh), which
/// the reconciliation workflow is safe against.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TicketingError {
    // ═══════════════════════════════════════════════════════════
    // Not found
    // ═══════════════════════════════════════════════════════════

    /// No user with this id.
    #[error("User {0} not found")]
    UserNotFound(UserId),

    /// The user exists but owns no tickets.
    #[error("No tickets found for user {0}")]
    NoTicketsFound(UserId),

    // ═══════════════════════════════════════════════════════════
    // Admission
    // ═══════════════════════════════════════════════════════════

    /// Not enough tickets left for the request.
    #[error("You are trying to book {requested} tickets, but only {remaining} tickets are available.")]
    CapacityExceeded {
        /// Tickets asked for
        requested: u64,
        /// Tickets left at the time of the check
        remaining: u64,
    },

    /// The request itself is malformed.
    #[error("Invalid request: {0}")]
    Validation(String),

    // ═══════════════════════════════════════════════════════════
    // Payment provider
    // ═══════════════════════════════════════════════════════════

    /// The provider call failed (network, auth, unexpected response).
    #[error("Payment provider error: {0}")]
    ExternalProviderError(String),

    /// The provider does not vouch for this payment (not approved, or made for
    /// a different user).
    #[error("Payment {payment_id} is not confirmed: {reason}")]
    PaymentNotConfirmed {
        /// Payment that failed verification
        payment_id: PaymentId,
        /// Why verification failed
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Storage
    // ═══════════════════════════════════════════════════════════

    /// The store could not be read.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Writing tickets failed; nothing was persisted.
    #[error("Failed to persist tickets: {0}")]
    PersistFailed(String),
}

impl TicketingError {
    /// Returns `true` if the caller can fix the request and try again.
    ///
    /// # Examples
    ///
    /// ```
    /// # use ticketbooth_core::TicketingError;
    /// assert!(TicketingError::Validation("bad".into()).is_client_error());
    /// assert!(!TicketingError::PersistFailed("disk".into()).is_client_error());
    /// ```
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound(_)
                | Self::NoTicketsFound(_)
                | Self::CapacityExceeded { .. }
                | Self::Validation(_)
                | Self::PaymentNotConfirmed { .. }
        )
    }
}
