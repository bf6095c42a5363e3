//! Payment endpoints: start a checkout, and the provider's return and cancel
//! callbacks.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    response::Redirect,
    Json,
};
use serde::{Deserialize, Serialize};
use ticketbooth_core::{PaymentId, ReconciliationOutcome, TicketToken, UserId};
use uuid::Uuid;

/// Parse a user id taken from the path.
///
/// # Errors
///
/// 422 if `raw` is not a UUID.
pub fn parse_user_id(raw: &str) -> Result<UserId, AppError> {
    Uuid::parse_str(raw)
        .map(UserId::from_uuid)
        .map_err(|_| AppError::validation(format!("'{raw}' is not a valid user id")))
}

/// Create a provider payment for the user's tickets and send them to approve it.
///
/// `GET /api/payments/{user_id}/process` responds `303 See Other` to the
/// provider's approval page.
///
/// # Errors
///
/// 404 for an unknown user, 502 if the provider fails.
pub async fn process(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Redirect, AppError> {
    let user_id = parse_user_id(&user_id)?;

    let redirect = state
        .office
        .checkout
        .begin_checkout(
            user_id,
            state.url(&format!("/api/payments/{user_id}/success")),
            state.url(&format!("/api/payments/{user_id}/cancel")),
        )
        .await?;

    Ok(Redirect::to(&redirect.approval_url))
}

/// Query string the provider appends to the return URL.
#[derive(Debug, Deserialize)]
pub struct SuccessParams {
    /// Provider payment id
    #[serde(rename = "paymentId")]
    pub payment_id: Option<String>,
    /// Provider payer id, used to execute the payment
    #[serde(rename = "PayerID")]
    pub payer_id: Option<String>,
}

/// Tickets issued from a payment.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    /// Ticket holder
    pub user_id: UserId,
    /// Reconciled payment
    pub payment_id: PaymentId,
    /// Every ticket issued from the payment
    pub tokens: Vec<TicketToken>,
    /// `true` when this call only returned tickets issued earlier
    pub already_reconciled: bool,
    /// Tickets still for sale
    pub remaining: u64,
}

/// Provider return URL: verify the payment, then charge it and issue the
/// tickets together. A payment whose tickets no longer fit is never charged.
///
/// `GET /api/payments/{user_id}/success?paymentId=..&PayerID=..`. Safe to call
/// any number of times; later calls return the same tickets.
///
/// # Errors
///
/// 422 for a missing or malformed payment id, 402 if the provider doesn't
/// confirm the payment, 409 if the tickets no longer fit.
pub async fn success(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<SuccessParams>,
) -> Result<Json<SuccessResponse>, AppError> {
    let user_id = parse_user_id(&user_id)?;
    let payment_id = PaymentId::parse(params.payment_id.as_deref().unwrap_or_default())?;

    let capture = state
        .office
        .checkout
        .verify_confirmation(user_id, &payment_id, params.payer_id.as_deref())
        .await?;

    // The payment is only executed once the tickets are admitted
    let reconciliation = state
        .office
        .reconciler
        .reconcile_settled(user_id, &payment_id, &capture)
        .await?;

    Ok(Json(SuccessResponse {
        user_id,
        payment_id: reconciliation.payment_id,
        tokens: reconciliation.tokens,
        already_reconciled: reconciliation.outcome == ReconciliationOutcome::AlreadyReconciled,
        remaining: reconciliation.remaining,
    }))
}

/// Acknowledgement of a cancelled approval.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    /// User who cancelled
    pub user_id: UserId,
    /// Always `cancelled`
    pub status: &'static str,
    /// Human-readable note
    pub message: &'static str,
}

/// Provider cancel URL. Nothing changes; the user may start a new checkout.
///
/// # Errors
///
/// 422 if the user id is malformed.
pub async fn cancel(Path(user_id): Path<String>) -> Result<Json<CancelResponse>, AppError> {
    let user_id = parse_user_id(&user_id)?;
    tracing::info!(user_id = %user_id, "Payment cancelled by user");

    Ok(Json(CancelResponse {
        user_id,
        status: "cancelled",
        message: "Payment was cancelled. No tickets were issued.",
    }))
}
