//! # `PayPal` payment provider
//!
//! [`PaymentProvider`](ticketbooth_core::PaymentProvider) over the `PayPal`
//! REST payments v1 API.
//!
//! ## Flow
//!
//! 1. `POST /v1/oauth2/token` with the client-credentials grant (cached)
//! 2. `POST /v1/payments/payment` creates a `sale` and returns its
//!    `approval_url` link
//! 3. After the buyer returns, `GET /v1/payments/payment/{id}` to check it
//! 4. Once the tickets are admitted, `POST /v1/payments/payment/{id}/execute`
//!    with the payer id charges the buyer
//!
//! ## Example
//!
//! ```no_run
//! use ticketbooth_paypal::PayPalClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // PAYPAL_CLIENT_ID / PAYPAL_CLIENT_SECRET / PAYPAL_API_URL
//!     let client = PayPalClient::from_env()?;
//!     let payment = client.get("PAY-1AB23456CD789012EF34GHIJ").await?;
//!     println!("state: {}", payment.state);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod models;

pub use client::{LIVE_API_URL, PayPalClient, SANDBOX_API_URL};
pub use error::PayPalError;
