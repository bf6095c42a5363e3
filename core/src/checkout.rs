//! Checkout: creating provider payments and verifying their confirmations.
//!
//! Verification is read only. Executing the payment, which charges the
//! buyer, is deferred to a [`PaymentCapture`] that reconciliation runs once
//! the tickets are admitted.

use crate::config::TicketConfig;
use crate::error::{Result, TicketingError};
use crate::provider::{PaymentProvider, PaymentRequest, PaymentState};
use crate::reconciliation::Settlement;
use crate::store::TicketStore;
use crate::types::{Money, PaymentId, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Description shown to the buyer on the provider's page.
pub const PAYMENT_DESCRIPTION: &str = "Registration Fee";

/// Where to send a user to approve their payment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRedirect {
    /// Provider payment id
    pub payment_id: PaymentId,
    /// Provider approval page
    pub approval_url: String,
    /// Amount being charged
    pub amount: Money,
}

/// Starts checkouts and verifies the provider callbacks that end them.
#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn TicketStore>,
    provider: Arc<dyn PaymentProvider>,
    ticket_price: Money,
    currency: String,
    verify_confirmations: bool,
}

impl CheckoutService {
    /// Create a checkout service.
    ///
    /// With `verify_confirmations` off, callbacks are trusted as-is. Only meant
    /// for local development against a provider sandbox.
    #[must_use]
    pub fn new(
        store: Arc<dyn TicketStore>,
        provider: Arc<dyn PaymentProvider>,
        config: &TicketConfig,
        verify_confirmations: bool,
    ) -> Self {
        Self {
            store,
            provider,
            ticket_price: config.ticket_price,
            currency: config.currency.clone(),
            verify_confirmations,
        }
    }

    /// Create a payment for the user's tickets and return the approval page.
    ///
    /// # Errors
    ///
    /// - `UserNotFound` if `user_id` is unknown
    /// - `Validation` if the total overflows
    /// - `ExternalProviderError` if the provider fails
    pub async fn begin_checkout(
        &self,
        user_id: UserId,
        return_url: String,
        cancel_url: String,
    ) -> Result<CheckoutRedirect> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or(TicketingError::UserNotFound(user_id))?;

        let amount = self
            .ticket_price
            .checked_mul(user.number_of_tickets)
            .ok_or_else(|| TicketingError::Validation("order total is too large".to_string()))?;

        let request = PaymentRequest {
            user_id,
            amount,
            currency: self.currency.clone(),
            description: PAYMENT_DESCRIPTION.to_string(),
            return_url,
            cancel_url,
        };

        let created = match self.provider.create_payment(&request).await {
            Ok(created) => created,
            Err(e) => {
                crate::metrics::record_checkout_failed();
                tracing::error!(user_id = %user_id, error = %e, "Failed to create payment");
                return Err(e);
            }
        };

        crate::metrics::record_checkout_started();
        tracing::info!(
            user_id = %user_id,
            payment_id = %created.payment_id,
            amount = %amount,
            currency = %self.currency,
            "Payment created"
        );

        Ok(CheckoutRedirect {
            payment_id: created.payment_id,
            approval_url: created.approval_url,
            amount,
        })
    }

    /// Check with the provider that `payment_id` was approved by `user_id`,
    /// without charging them.
    ///
    /// Accepts a payment that is already complete, or one still `created`
    /// when the callback carries the payer id needed to execute it. The
    /// returned capture executes it later, inside reconciliation.
    ///
    /// # Errors
    ///
    /// - `PaymentNotConfirmed` if the payment can't be completed or belongs
    ///   to another user
    /// - `ExternalProviderError` if the provider can't be asked
    pub async fn verify_confirmation(
        &self,
        user_id: UserId,
        payment_id: &PaymentId,
        payer_id: Option<&str>,
    ) -> Result<PaymentCapture> {
        if !self.verify_confirmations {
            tracing::warn!(
                user_id = %user_id,
                payment_id = %payment_id,
                "Payment confirmation verification disabled, trusting callback"
            );
            return Ok(PaymentCapture::trusted(user_id, payment_id.clone()));
        }

        let payment = self.provider.lookup_payment(payment_id).await?;

        let verdict = if payment.user_id != Some(user_id) {
            Err("payment was not made for this user".to_string())
        } else {
            match (&payment.state, payer_id) {
                (PaymentState::Completed, _) => Ok(Capture::AlreadyCaptured),
                (PaymentState::Created, Some(payer_id)) => Ok(Capture::Execute {
                    provider: Arc::clone(&self.provider),
                    payer_id: payer_id.to_string(),
                }),
                (state, _) => Err(format!("payment is in state '{state}'")),
            }
        };

        match verdict {
            Ok(action) => {
                tracing::debug!(
                    user_id = %user_id,
                    payment_id = %payment_id,
                    state = %payment.state,
                    "Payment confirmed"
                );
                Ok(PaymentCapture {
                    user_id,
                    payment_id: payment_id.clone(),
                    action,
                })
            }
            Err(reason) => {
                crate::metrics::record_payment_unconfirmed();
                tracing::warn!(
                    user_id = %user_id,
                    payment_id = %payment_id,
                    state = %payment.state,
                    reason = %reason,
                    "Payment confirmation rejected"
                );
                Err(TicketingError::PaymentNotConfirmed {
                    payment_id: payment_id.clone(),
                    reason,
                })
            }
        }
    }
}

#[derive(Clone)]
enum Capture {
    Trusted,
    AlreadyCaptured,
    Execute {
        provider: Arc<dyn PaymentProvider>,
        payer_id: String,
    },
}

/// A verified payment, ready to be charged.
///
/// Pass it to
/// [`PaymentReconciler::reconcile_settled`](crate::PaymentReconciler::reconcile_settled),
/// which executes it only after the tickets are admitted.
#[derive(Clone)]
pub struct PaymentCapture {
    user_id: UserId,
    payment_id: PaymentId,
    action: Capture,
}

impl PaymentCapture {
    /// Capture for an unverified callback: nothing is executed.
    #[must_use]
    pub const fn trusted(user_id: UserId, payment_id: PaymentId) -> Self {
        Self {
            user_id,
            payment_id,
            action: Capture::Trusted,
        }
    }

    /// Whether settling will call the provider
    #[must_use]
    pub const fn executes(&self) -> bool {
        matches!(self.action, Capture::Execute { .. })
    }
}

impl std::fmt::Debug for PaymentCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentCapture")
            .field("user_id", &self.user_id)
            .field("payment_id", &self.payment_id)
            .field("executes", &self.executes())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Settlement for PaymentCapture {
    fn is_captured(&self) -> bool {
        matches!(self.action, Capture::AlreadyCaptured)
    }

    async fn settle(&self) -> Result<()> {
        let Capture::Execute { provider, payer_id } = &self.action else {
            return Ok(());
        };

        tracing::info!(
            user_id = %self.user_id,
            payment_id = %self.payment_id,
            "Executing payment"
        );
        let payment = provider.execute_payment(&self.payment_id, payer_id).await?;

        if payment.state == PaymentState::Completed {
            Ok(())
        } else {
            crate::metrics::record_payment_unconfirmed();
            tracing::warn!(
                user_id = %self.user_id,
                payment_id = %self.payment_id,
                state = %payment.state,
                "Payment not completed after execution"
            );
            Err(TicketingError::PaymentNotConfirmed {
                payment_id: self.payment_id.clone(),
                reason: format!("payment is in state '{}' after execution", payment.state),
            })
        }
    }
}
