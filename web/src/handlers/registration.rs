//! Registration endpoint.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    Json,
};
use serde::Serialize;
use ticketbooth_core::{Registration, UserId};

/// Response for a successful registration.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    /// New user id
    pub user_id: UserId,
    /// Tickets requested
    pub number_of_tickets: u32,
    /// Where to continue: the payment step
    pub next: String,
}

/// Register for tickets and continue to payment.
///
/// Responds `303 See Other` with `Location: /api/payments/{user_id}/process`.
///
/// ```bash
/// curl -i -X POST http://localhost:8080/api/register \
///   -H 'content-type: application/json' \
///   -d '{"title":"Ms","firstName":"Ada","lastName":"Lovelace","email":"ada@example.com",
///        "phoneNumber":"020 7946 0000","age":36,"gender":"Female","numberOfTickets":2,
///        "address1":"12 St James'"'"'s Square","city":"London","postCode":"SW1Y 4JH"}'
/// ```
///
/// # Errors
///
/// 422 for an invalid form, 409 when not enough tickets remain.
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<Registration>, JsonRejection>,
) -> Result<(StatusCode, [(header::HeaderName, String); 1], Json<RegisterResponse>), AppError> {
    let Json(registration) = body.map_err(|rejection| AppError::validation(rejection.body_text()))?;

    let user = state.office.registration.register(registration).await?;
    let next = format!("/api/payments/{}/process", user.id);

    Ok((
        StatusCode::SEE_OTHER,
        [(header::LOCATION, next.clone())],
        Json(RegisterResponse {
            user_id: user.id,
            number_of_tickets: user.number_of_tickets,
            next,
        }),
    ))
}
