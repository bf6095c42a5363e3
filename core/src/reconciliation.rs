//! Payment reconciliation workflow.
//!
//! Converts a payment the provider has confirmed into persisted ticket tokens,
//! exactly once per payment id.
//!
//! # State machine
//!
//! ```text
//! (user, payment) ── Unseen ──[admit + insert batch]──► Reconciled
//!                                                          │
//!                        reconcile again ◄─────────────────┘ (returns same tokens,
//!                                                             inserts nothing)
//! ```
//!
//! The existence check, the capacity check and the insert all run inside one
//! [`IssuanceScope`](crate::store::IssuanceScope), so concurrent callbacks for
//! the same payment insert one batch between them and concurrent payments
//! can't oversell.
//!
//! A failed insert leaves the pair Unseen; calling again is always safe.
//!
//! # Settlement
//!
//! Charging the buyer is a [`Settlement`] run inside the scope after the
//! tickets are admitted and before they are written, so a payment is never
//! captured for tickets that don't fit. A capture followed by a failed insert
//! is logged at error level and counted as unfulfilled; the next call finds
//! the payment already captured and only writes the tickets.

use crate::config::TicketConfig;
use crate::environment::Clock;
use crate::error::{Result, TicketingError};
use crate::store::TicketStore;
use crate::tokens::TokenGenerator;
use crate::types::{Capacity, PaymentId, PaymentToken, TicketToken, User, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How a reconciliation ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationOutcome {
    /// Tickets were created by this call
    Issued,
    /// The payment had already been reconciled; nothing was written
    AlreadyReconciled,
}

impl ReconciliationOutcome {
    /// Label used in logs and metrics
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Issued => "issued",
            Self::AlreadyReconciled => "already_reconciled",
        }
    }
}

/// Result of a successful reconciliation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// User the call was made for
    pub user_id: UserId,
    /// Payment that was reconciled
    pub payment_id: PaymentId,
    /// Every ticket issued from the payment, in issue order
    pub tokens: Vec<TicketToken>,
    /// Whether this call created them
    pub outcome: ReconciliationOutcome,
    /// Tickets left for sale, as counted inside the issuance scope
    pub remaining: u64,
}

/// Provider-side step that completes a payment.
///
/// Runs only for an unseen payment whose tickets were admitted, while the
/// issuance scope is still held.
#[async_trait]
pub trait Settlement: Send + Sync {
    /// Whether the buyer has been charged already, before [`settle`](Self::settle).
    fn is_captured(&self) -> bool;

    /// Charge the buyer.
    ///
    /// # Errors
    ///
    /// Any error aborts the reconciliation before tickets are written.
    async fn settle(&self) -> Result<()>;
}

/// Settlement for a payment that is already complete at the provider.
#[derive(Clone, Copy, Debug, Default)]
pub struct Settled;

#[async_trait]
impl Settlement for Settled {
    fn is_captured(&self) -> bool {
        true
    }

    async fn settle(&self) -> Result<()> {
        Ok(())
    }
}

/// What to do with a payment, decided from what the scope observed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IssuePlan {
    /// Tickets exist already: hand them back unchanged
    Reuse(Vec<TicketToken>),
    /// Insert these rows
    Issue(Vec<PaymentToken>),
}

/// Pure decision at the heart of reconciliation.
///
/// `existing` are the tickets already issued for the payment and `issued` the
/// total ticket count, both read inside the issuance scope.
///
/// # Errors
///
/// Returns `CapacityExceeded` if the payment is unseen and the user's tickets
/// don't fit.
pub fn plan_issuance(
    user: &User,
    payment_id: &PaymentId,
    existing: Vec<PaymentToken>,
    issued: u64,
    capacity: Capacity,
    generator: &dyn TokenGenerator,
    now: DateTime<Utc>,
) -> Result<IssuePlan> {
    if !existing.is_empty() {
        return Ok(IssuePlan::Reuse(
            existing.into_iter().map(|row| row.token).collect(),
        ));
    }

    capacity.admit(issued, user.number_of_tickets)?;

    let rows = generator
        .generate(payment_id, user.number_of_tickets)
        .into_iter()
        .map(|token| PaymentToken {
            user_id: user.id,
            token,
            payment_id: payment_id.clone(),
            issued_at: now,
        })
        .collect();

    Ok(IssuePlan::Issue(rows))
}

/// Reconciles confirmed payments into tickets.
#[derive(Clone)]
pub struct PaymentReconciler {
    store: Arc<dyn TicketStore>,
    capacity: Capacity,
    generator: Arc<dyn TokenGenerator>,
    clock: Arc<dyn Clock>,
}

impl PaymentReconciler {
    /// Create a reconciler
    #[must_use]
    pub fn new(
        store: Arc<dyn TicketStore>,
        capacity: Capacity,
        generator: Arc<dyn TokenGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            capacity,
            generator,
            clock,
        }
    }

    /// Create a reconciler using the configured capacity and token scheme
    #[must_use]
    pub fn from_config(store: Arc<dyn TicketStore>, config: &TicketConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(store, config.capacity, config.token_scheme.generator(), clock)
    }

    /// Return the tickets for `payment_id`, issuing them if this is the first
    /// time the payment is seen.
    ///
    /// The payment must already be complete at the provider; use
    /// [`reconcile_settled`](Self::reconcile_settled) when it still has to be
    /// captured.
    ///
    /// # Errors
    ///
    /// - `UserNotFound` if `user_id` is unknown
    /// - `CapacityExceeded` if the payment is new and its tickets don't fit
    /// - `StorageUnavailable` if the store can't be read
    /// - `PersistFailed` if the insert fails (nothing is written)
    pub async fn reconcile(&self, user_id: UserId, payment_id: &PaymentId) -> Result<Reconciliation> {
        self.reconcile_settled(user_id, payment_id, &Settled).await
    }

    /// Like [`reconcile`](Self::reconcile), running `settlement` between the
    /// admission check and the insert of an unseen payment.
    ///
    /// # Errors
    ///
    /// As [`reconcile`](Self::reconcile), plus whatever `settlement` returns;
    /// nothing is written when it fails.
    pub async fn reconcile_settled(
        &self,
        user_id: UserId,
        payment_id: &PaymentId,
        settlement: &dyn Settlement,
    ) -> Result<Reconciliation> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or(TicketingError::UserNotFound(user_id))?;

        let mut scope = self.store.begin_issuance().await?;
        let existing = scope.find_tokens_by_payment_id(payment_id).await?;
        if let Some(row) = existing.iter().find(|row| row.user_id != user_id) {
            tracing::warn!(
                user_id = %user_id,
                owner_id = %row.user_id,
                payment_id = %payment_id,
                "Payment was reconciled for a different user"
            );
        }

        let issued = scope.count_tokens().await?;

        let plan = plan_issuance(
            &user,
            payment_id,
            existing,
            issued,
            self.capacity,
            self.generator.as_ref(),
            self.clock.now(),
        );

        let (tokens, outcome, remaining) = match plan {
            Ok(IssuePlan::Reuse(tokens)) => {
                drop(scope);
                tracing::info!(
                    user_id = %user_id,
                    payment_id = %payment_id,
                    tickets = tokens.len(),
                    "Payment already reconciled, returning existing tickets"
                );
                (
                    tokens,
                    ReconciliationOutcome::AlreadyReconciled,
                    self.capacity.remaining(issued),
                )
            }
            Ok(IssuePlan::Issue(rows)) => {
                let captured_before = settlement.is_captured();
                if let Err(e) = settlement.settle().await {
                    drop(scope);
                    tracing::warn!(
                        user_id = %user_id,
                        payment_id = %payment_id,
                        error = %e,
                        "Payment could not be settled, no tickets issued"
                    );
                    return Err(e);
                }

                if let Err(e) = scope.insert_tokens_atomic(&rows).await {
                    crate::metrics::record_payment_unfulfilled();
                    tracing::error!(
                        user_id = %user_id,
                        payment_id = %payment_id,
                        tickets = rows.len(),
                        captured_now = !captured_before,
                        error = %e,
                        "Payment captured but tickets not persisted; retry reconciliation or refund"
                    );
                    return Err(e);
                }

                let remaining = self.capacity.remaining(issued + rows.len() as u64);
                crate::metrics::record_tickets_issued(rows.len());
                crate::metrics::update_tickets_remaining(remaining);
                tracing::info!(
                    user_id = %user_id,
                    payment_id = %payment_id,
                    tickets = rows.len(),
                    "Tickets issued"
                );
                (
                    rows.into_iter().map(|row| row.token).collect(),
                    ReconciliationOutcome::Issued,
                    remaining,
                )
            }
            Err(e) => {
                drop(scope);
                crate::metrics::record_reconciliation_rejected();
                if settlement.is_captured() {
                    crate::metrics::record_payment_unfulfilled();
                    tracing::error!(
                        user_id = %user_id,
                        payment_id = %payment_id,
                        requested = user.number_of_tickets,
                        issued,
                        error = %e,
                        "Payment already captured but tickets can't be issued; refund required"
                    );
                } else {
                    tracing::warn!(
                        user_id = %user_id,
                        payment_id = %payment_id,
                        requested = user.number_of_tickets,
                        issued,
                        error = %e,
                        "Tickets can't be issued, payment left uncaptured"
                    );
                }
                return Err(e);
            }
        };

        crate::metrics::record_reconciliation(outcome);

        Ok(Reconciliation {
            user_id,
            payment_id: payment_id.clone(),
            tokens,
            outcome,
            remaining,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tokens::SequentialTokenGenerator;

    fn user(tickets: u32) -> User {
        User {
            id: UserId::new(),
            title: "Mr".to_string(),
            first_name: "Alan".to_string(),
            last_name: "Turing".to_string(),
            email: "alan@example.com".to_string(),
            phone_number: "0161 496 0000".to_string(),
            age: 41,
            gender: "Male".to_string(),
            number_of_tickets: tickets,
            address1: "Hollymeade".to_string(),
            address2: None,
            city: "Wilmslow".to_string(),
            post_code: "SK9 1AA".to_string(),
            registered_at: Utc::now(),
        }
    }

    #[test]
    fn test_unseen_payment_issues_one_row_per_ticket() {
        let user = user(3);
        let payment_id = PaymentId::new("P1");

        let plan = plan_issuance(
            &user,
            &payment_id,
            Vec::new(),
            0,
            Capacity::new(5),
            &SequentialTokenGenerator::default(),
            Utc::now(),
        )
        .unwrap();

        let IssuePlan::Issue(rows) = plan else {
            unreachable!("unseen payment must be issued");
        };
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.user_id == user.id && row.payment_id == payment_id));
        let tokens: Vec<_> = rows.iter().map(|row| row.token.as_str()).collect();
        assert_eq!(tokens, vec!["SHA10600", "SHA10599", "SHA10598"]);
    }

    #[test]
    fn test_seen_payment_reuses_tokens_even_when_sold_out() {
        let user = user(2);
        let payment_id = PaymentId::new("P1");
        let existing: Vec<_> = ["A", "B"]
            .into_iter()
            .map(|token| PaymentToken {
                user_id: user.id,
                token: TicketToken::new(token),
                payment_id: payment_id.clone(),
                issued_at: Utc::now(),
            })
            .collect();

        let plan = plan_issuance(
            &user,
            &payment_id,
            existing,
            10,
            Capacity::new(2),
            &SequentialTokenGenerator::default(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(
            plan,
            IssuePlan::Reuse(vec![TicketToken::new("A"), TicketToken::new("B")])
        );
    }

    #[test]
    fn test_unseen_payment_over_capacity_is_rejected() {
        let result = plan_issuance(
            &user(2),
            &PaymentId::new("P2"),
            Vec::new(),
            4,
            Capacity::new(5),
            &SequentialTokenGenerator::default(),
            Utc::now(),
        );

        assert_eq!(
            result,
            Err(TicketingError::CapacityExceeded {
                requested: 2,
                remaining: 1
            })
        );
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(ReconciliationOutcome::Issued.as_str(), "issued");
        assert_eq!(
            ReconciliationOutcome::AlreadyReconciled.as_str(),
            "already_reconciled"
        );
    }
}
