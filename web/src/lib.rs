//! HTTP surface for Ticketbooth.
//!
//! Thin Axum handlers over [`TicketOffice`](ticketbooth_core::TicketOffice):
//! each one parses the request, calls a single service, and maps
//! [`TicketingError`](ticketbooth_core::TicketingError) to a status code
//! through [`AppError`].
//!
//! # Request Flow
//!
//! 1. `POST /api/register` stores the user and redirects to the payment step
//! 2. `GET /api/payments/{id}/process` creates the provider payment and
//!    redirects to its approval page
//! 3. The provider sends the buyer back to `/api/payments/{id}/success`, which
//!    confirms the payment and issues the tickets
//! 4. `GET /api/tickets/{id}/download` returns them as a text file
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use ticketbooth_core::{SystemClock, TicketConfig, TicketOffice};
//! use ticketbooth_testing::{InMemoryTicketStore, MockPaymentProvider};
//! use ticketbooth_web::{build_router, AppState};
//!
//! let office = TicketOffice::new(
//!     Arc::new(InMemoryTicketStore::new()),
//!     Arc::new(MockPaymentProvider::new()),
//!     TicketConfig::default(),
//!     Arc::new(SystemClock),
//!     true,
//! );
//! let app = build_router(AppState::new(office, "http://localhost:8080"));
//! # drop(app);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use middleware::{correlation_id_layer, CorrelationId, CORRELATION_ID_HEADER};
pub use routes::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
