//! Payment provider abstraction.
//!
//! Abstraction over hosted-checkout processors such as `PayPal`: we create a
//! payment, send the buyer to the provider's approval page, and get them back on
//! our return URL with the provider's payment id.

use crate::error::Result;
use crate::types::{Money, PaymentId, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment to create at the provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Who is paying; stored in the provider's custom field so the
    /// confirmation can be tied back to the user.
    pub user_id: UserId,
    /// Total to charge
    pub amount: Money,
    /// ISO 4217 currency code
    pub currency: String,
    /// Line shown to the buyer
    pub description: String,
    /// Where the provider sends the buyer after approval
    pub return_url: String,
    /// Where the provider sends the buyer after cancelling
    pub cancel_url: String,
}

/// Payment created at the provider, awaiting buyer approval.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedPayment {
    /// Provider payment id
    pub payment_id: PaymentId,
    /// Provider page the buyer must visit to approve
    pub approval_url: String,
}

/// Where a provider payment stands.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    /// Created, possibly approved by the buyer, but not executed: no money
    /// has moved yet
    Created,
    /// Executed: the buyer has been charged
    Completed,
    /// Anything else the provider reports (`failed`, `expired`, ...)
    Other(String),
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::Completed => f.write_str("completed"),
            Self::Other(state) => f.write_str(state),
        }
    }
}

/// Provider's view of a payment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderPayment {
    /// Provider payment id
    pub payment_id: PaymentId,
    /// Current state
    pub state: PaymentState,
    /// User recorded in the payment's custom field, if any
    pub user_id: Option<UserId>,
}

/// External payment provider.
///
/// Implementations report every failure as
/// [`TicketingError::ExternalProviderError`](crate::TicketingError::ExternalProviderError).
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a payment and return where to send the buyer.
    ///
    /// # Errors
    ///
    /// Returns `ExternalProviderError` if the provider rejects the request or
    /// can't be reached.
    async fn create_payment(&self, request: &PaymentRequest) -> Result<CreatedPayment>;

    /// Fetch the payment's current state. Never moves money.
    ///
    /// # Errors
    ///
    /// Returns `ExternalProviderError` if the provider can't be reached or
    /// doesn't know the payment.
    async fn lookup_payment(&self, payment_id: &PaymentId) -> Result<ProviderPayment>;

    /// Execute a payment the buyer approved, charging them.
    ///
    /// # Errors
    ///
    /// Returns `ExternalProviderError` if the provider refuses (not approved,
    /// already executed) or can't be reached.
    async fn execute_payment(&self, payment_id: &PaymentId, payer_id: &str) -> Result<ProviderPayment>;
}
