//! Mock payment provider.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use ticketbooth_core::provider::{
    CreatedPayment, PaymentProvider, PaymentRequest, PaymentState, ProviderPayment,
};
use ticketbooth_core::types::PaymentId;
use ticketbooth_core::{Result, TicketingError};

#[derive(Debug, Default)]
struct State {
    created: Vec<PaymentRequest>,
    lookups: Vec<PaymentId>,
    executions: Vec<(PaymentId, String)>,
    payments: HashMap<PaymentId, ProviderPayment>,
    failure: Option<String>,
}

/// `PaymentProvider` that never leaves the process.
///
/// Created payments are `PAY-MOCK-{n}`, in state `created` for the user that
/// created them, and move to `completed` when executed. Use
/// [`set_payment`](Self::set_payment) to script a different state and
/// [`fail_with`](Self::fail_with) to make every call fail.
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockPaymentProvider {
    state: Arc<Mutex<State>>,
}

impl MockPaymentProvider {
    /// Approval page prefix returned by `create_payment`.
    pub const APPROVAL_URL: &'static str = "https://www.sandbox.paypal.com/checkoutnow?token=";

    /// Create a provider that executes everything it created
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the provider's view of `payment.payment_id`.
    pub fn set_payment(&self, payment: ProviderPayment) {
        if let Ok(mut state) = self.state.lock() {
            state.payments.insert(payment.payment_id.clone(), payment);
        }
    }

    /// Fail every call with `ExternalProviderError(message)`.
    pub fn fail_with(&self, message: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.failure = Some(message.into());
        }
    }

    /// Requests received by `create_payment`
    #[must_use]
    pub fn created(&self) -> Vec<PaymentRequest> {
        self.state
            .lock()
            .map(|state| state.created.clone())
            .unwrap_or_default()
    }

    /// Payment ids received by `lookup_payment`
    #[must_use]
    pub fn lookups(&self) -> Vec<PaymentId> {
        self.state
            .lock()
            .map(|state| state.lookups.clone())
            .unwrap_or_default()
    }

    /// `(payment_id, payer_id)` pairs received by `execute_payment`, that is
    /// every attempt to charge the buyer
    #[must_use]
    pub fn executions(&self) -> Vec<(PaymentId, String)> {
        self.state
            .lock()
            .map(|state| state.executions.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>> {
        let state = self
            .state
            .lock()
            .map_err(|_| TicketingError::ExternalProviderError("mock poisoned".to_string()))?;
        if let Some(message) = &state.failure {
            return Err(TicketingError::ExternalProviderError(message.clone()));
        }
        Ok(state)
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_payment(&self, request: &PaymentRequest) -> Result<CreatedPayment> {
        let mut state = self.lock()?;
        state.created.push(request.clone());

        let payment_id = PaymentId::new(format!("PAY-MOCK-{}", state.created.len()));
        state.payments.insert(
            payment_id.clone(),
            ProviderPayment {
                payment_id: payment_id.clone(),
                state: PaymentState::Created,
                user_id: Some(request.user_id),
            },
        );

        Ok(CreatedPayment {
            approval_url: format!("{}EC-{}", Self::APPROVAL_URL, state.created.len()),
            payment_id,
        })
    }

    async fn lookup_payment(&self, payment_id: &PaymentId) -> Result<ProviderPayment> {
        let mut state = self.lock()?;
        state.lookups.push(payment_id.clone());

        state.payments.get(payment_id).cloned().ok_or_else(|| {
            TicketingError::ExternalProviderError(format!("payment {payment_id} not found"))
        })
    }

    async fn execute_payment(
        &self,
        payment_id: &PaymentId,
        payer_id: &str,
    ) -> Result<ProviderPayment> {
        let mut state = self.lock()?;
        state
            .executions
            .push((payment_id.clone(), payer_id.to_string()));

        let payment = state.payments.get_mut(payment_id).ok_or_else(|| {
            TicketingError::ExternalProviderError(format!("payment {payment_id} not found"))
        })?;
        if payment.state != PaymentState::Created {
            return Err(TicketingError::ExternalProviderError(format!(
                "payment {payment_id} can't be executed in state '{}'",
                payment.state
            )));
        }
        payment.state = PaymentState::Completed;
        Ok(payment.clone())
    }
}
