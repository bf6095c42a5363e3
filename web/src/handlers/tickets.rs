//! Inventory and ticket download endpoints.

use crate::error::AppError;
use crate::handlers::payments::parse_user_id;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Remaining inventory.
#[derive(Debug, Serialize)]
pub struct RemainingResponse {
    /// Total sellable tickets
    pub capacity: u64,
    /// Tickets not yet issued
    pub remaining: u64,
}

/// `GET /api/tickets/remaining`
///
/// # Errors
///
/// 503 if the store can't be read.
pub async fn remaining(State(state): State<AppState>) -> Result<Json<RemainingResponse>, AppError> {
    let remaining = state.office.ledger.remaining().await?;
    Ok(Json(RemainingResponse {
        capacity: state.office.ledger.capacity().get(),
        remaining,
    }))
}

/// `GET /api/tickets/{user_id}/download`: the user's tickets as a text file.
///
/// # Errors
///
/// 404 for an unknown user or a user without tickets.
pub async fn download(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Response, AppError> {
    let user_id = parse_user_id(&user_id)?;
    let file = state.office.export.export(user_id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, format!("{}; charset=utf-8", file.content_type)),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.file_name),
            ),
        ],
        file.body,
    )
        .into_response())
}
