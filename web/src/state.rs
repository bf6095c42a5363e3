//! Application state shared by the HTTP handlers.

use ticketbooth_core::TicketOffice;

/// Application state shared across all HTTP handlers.
///
/// Cloned per request; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// All ticket services
    pub office: TicketOffice,
    /// Public base URL of this service, used to build the provider's return
    /// and cancel URLs (e.g. `https://tickets.example.com`)
    pub public_base_url: String,
}

impl AppState {
    /// Create the application state.
    #[must_use]
    pub fn new(office: TicketOffice, public_base_url: impl Into<String>) -> Self {
        Self {
            office,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Absolute URL for `path` on this service
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.public_base_url)
    }
}
