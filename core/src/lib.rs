//! # Ticketbooth Core
//!
//! Ticket inventory and payment reconciliation for a single-event ticket shop.
//!
//! Users register for a number of tickets, pay through an external provider, and
//! receive one ticket token per purchased ticket. This crate holds the rules for
//! that flow; storage and the payment provider are injected through traits.
//!
//! ## Components
//!
//! - **Inventory Ledger** ([`ledger`]): `remaining = capacity - issued tokens`,
//!   and the admission decision built on it.
//! - **Payment Reconciliation** ([`reconciliation`]): turns a confirmed payment
//!   into persisted tokens exactly once per payment id.
//! - **Registration** ([`registration`]), **Checkout** ([`checkout`]) and
//!   **Ticket Export** ([`export`]): the thin steps around the workflow.
//!
//! ## Flow
//!
//! ```text
//! register ──► ledger.admit (advisory) ──► insert user
//!                                              │
//! begin_checkout ◄─────────────────────────────┘
//!      │  provider.create_payment
//!      ▼
//! provider approval page ──► success callback
//!                                 │ provider.lookup_payment (read only)
//!                                 ▼
//!                   reconcile (issuance scope, authoritative admission)
//!                                 │ provider.execute_payment, only once admitted
//!                                 ▼
//!                          export / download
//! ```
//!
//! ## Functional Core, Imperative Shell
//!
//! Every decision (admission arithmetic, the Unseen/Reconciled choice, token
//! generation) is a pure function. The services only sequence store calls around
//! those decisions, so the rules are testable without any I/O.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod checkout;
pub mod config;
pub mod environment;
pub mod error;
pub mod export;
pub mod ledger;
pub mod metrics;
pub mod office;
pub mod provider;
pub mod reconciliation;
pub mod registration;
pub mod store;
pub mod tokens;
pub mod types;

pub use checkout::{CheckoutRedirect, CheckoutService, PaymentCapture};
pub use config::{TicketConfig, TokenScheme};
pub use environment::{Clock, SystemClock};
pub use error::{Result, TicketingError};
pub use export::{TicketExport, TicketFile};
pub use ledger::InventoryLedger;
pub use office::TicketOffice;
pub use provider::{CreatedPayment, PaymentProvider, PaymentRequest, PaymentState, ProviderPayment};
pub use reconciliation::{PaymentReconciler, Reconciliation, ReconciliationOutcome, Settled, Settlement};
pub use registration::RegistrationService;
pub use store::{IssuanceScope, TicketStore};
pub use tokens::{DigestTokenGenerator, SequentialTokenGenerator, TokenGenerator};
pub use types::*;
