//! Error types for the `PayPal` client

use thiserror::Error;
use ticketbooth_core::TicketingError;

/// Errors that can occur when talking to the `PayPal` REST API
#[derive(Debug, Error)]
pub enum PayPalError {
    /// Missing `PAYPAL_CLIENT_ID` or `PAYPAL_CLIENT_SECRET`
    #[error("Missing PayPal credentials: {0} is not set")]
    MissingCredentials(&'static str),

    /// HTTP client could not be built
    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),

    /// HTTP request failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Response parsing failed
    #[error("Response parsing failed: {0}")]
    ResponseParseFailed(String),

    /// Unauthorized - invalid client credentials
    #[error("Unauthorized - invalid PayPal client credentials")]
    Unauthorized,

    /// Payment does not exist at `PayPal`
    #[error("Payment {0} not found")]
    PaymentNotFound(String),

    /// Created payment carried no approval link
    #[error("Payment {0} has no approval_url link")]
    MissingApprovalUrl(String),

    /// API returned an error
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error body from the API
        message: String,
    },
}

impl From<PayPalError> for TicketingError {
    fn from(error: PayPalError) -> Self {
        Self::ExternalProviderError(format!("PayPal: {error}"))
    }
}
