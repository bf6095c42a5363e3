//! Router composition.

use crate::handlers::{health, payments, registration, tickets};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Build the ticket shop router.
///
/// # Routes
///
/// - `GET /health` - Liveness
/// - `GET /ready` - Readiness (pings the store)
/// - `GET /api/tickets/remaining` - Inventory
/// - `POST /api/register` - Register, then continue to payment
/// - `GET /api/payments/:user_id/process` - Redirect to the provider's approval page
/// - `GET /api/payments/:user_id/success` - Provider return URL: issue tickets
/// - `GET /api/payments/:user_id/cancel` - Provider cancel URL
/// - `GET /api/tickets/:user_id/download` - Tickets as a text file
///
/// # Example
///
/// ```rust,ignore
/// let office = TicketOffice::new(store, provider, config, Arc::new(SystemClock), true);
/// let app = build_router(AppState::new(office, "https://tickets.example.com"));
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// ```
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Tickets
        .route("/api/tickets/remaining", get(tickets::remaining))
        .route("/api/tickets/:user_id/download", get(tickets::download))
        // Registration and payment
        .route("/api/register", post(registration::register))
        .route("/api/payments/:user_id/process", get(payments::process))
        .route("/api/payments/:user_id/success", get(payments::success))
        .route("/api/payments/:user_id/cancel", get(payments::cancel))
        .with_state(state)
        .layer(correlation_id_layer())
        .layer(TraceLayer::new_for_http())
}
