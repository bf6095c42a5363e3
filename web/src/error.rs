//! Error types for web handlers.
//!
//! Bridges [`TicketingError`] to HTTP responses. Every error is rendered as a
//! JSON body `{"code": ..., "message": ...}`; server-side failures are logged
//! with their source and never expose internals to the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use ticketbooth_core::TicketingError;

/// Application error type for web handlers.
///
/// # Examples
///
/// ```
/// use axum::http::StatusCode;
/// use ticketbooth_core::TicketingError;
/// use ticketbooth_web::AppError;
///
/// let err = AppError::from(TicketingError::Validation("age must be between 1 and 130".into()));
/// assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: &'static str,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>, code: &'static str) -> Self {
        Self {
            status,
            message: message.into(),
            code,
            source: None,
        }
    }

    /// Attach the underlying error for logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// HTTP status of the response
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message, code)
    }

    /// Create a 409 Conflict error.
    #[must_use]
    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message, code)
    }

    /// Create a 422 Unprocessable Entity error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message, "VALIDATION_ERROR")
    }

    /// Create a 402 Payment Required error.
    #[must_use]
    pub fn payment_required(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYMENT_REQUIRED, message, "PAYMENT_NOT_CONFIRMED")
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, code)
    }

    /// Create a 502 Bad Gateway error.
    #[must_use]
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message, "PAYMENT_PROVIDER_ERROR")
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message, "STORAGE_UNAVAILABLE")
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<TicketingError> for AppError {
    fn from(err: TicketingError) -> Self {
        let message = err.to_string();
        let mapped = match &err {
            TicketingError::UserNotFound(_) => Self::not_found("USER_NOT_FOUND", message),
            TicketingError::NoTicketsFound(_) => Self::not_found("NO_TICKETS_FOUND", message),
            TicketingError::CapacityExceeded { .. } => {
                Self::conflict("CAPACITY_EXCEEDED", message)
            }
            TicketingError::Validation(_) => Self::validation(message),
            TicketingError::PaymentNotConfirmed { .. } => Self::payment_required(message),
            TicketingError::ExternalProviderError(_) => {
                Self::bad_gateway("The payment provider could not process the request")
            }
            TicketingError::StorageUnavailable(_) => {
                Self::unavailable("The ticket store is temporarily unavailable")
            }
            TicketingError::PersistFailed(_) => {
                Self::internal("PERSIST_FAILED", "Tickets could not be saved; please retry")
            }
        };
        mapped.with_source(anyhow::Error::new(err))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: &'static str,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = self.code,
                    error = %source,
                    "Request failed"
                );
            } else {
                tracing::error!(status = %self.status, code = self.code, "Request failed");
            }
        } else {
            tracing::debug!(status = %self.status, code = self.code, message = %self.message, "Request rejected");
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticketbooth_core::{PaymentId, UserId};

    fn status_of(err: TicketingError) -> StatusCode {
        AppError::from(err).status()
    }

    #[test]
    fn test_status_mapping() {
        let user_id = UserId::new();
        assert_eq!(status_of(TicketingError::UserNotFound(user_id)), StatusCode::NOT_FOUND);
        assert_eq!(status_of(TicketingError::NoTicketsFound(user_id)), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(TicketingError::CapacityExceeded {
                requested: 2,
                remaining: 1
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(TicketingError::Validation("x".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(TicketingError::PaymentNotConfirmed {
                payment_id: PaymentId::new("P"),
                reason: "pending".into()
            }),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            status_of(TicketingError::ExternalProviderError("x".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(TicketingError::StorageUnavailable("x".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(TicketingError::PersistFailed("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_capacity_message_is_user_facing() {
        let err = AppError::from(TicketingError::CapacityExceeded {
            requested: 3,
            remaining: 1,
        });
        assert_eq!(
            err.to_string(),
            "[CAPACITY_EXCEEDED] You are trying to book 3 tickets, but only 1 tickets are available."
        );
    }

    #[test]
    fn test_server_errors_hide_details() {
        let err = AppError::from(TicketingError::StorageUnavailable(
            "connection refused at 10.0.0.5".into(),
        ));
        assert!(!err.to_string().contains("10.0.0.5"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
