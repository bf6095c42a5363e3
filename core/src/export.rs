//! Ticket export: a user's tokens as a downloadable text file.

use crate::error::{Result, TicketingError};
use crate::store::TicketStore;
use crate::types::{TicketToken, UserId};
use std::sync::Arc;

/// A rendered ticket file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TicketFile {
    /// Suggested download name, `Tickets_{user_id}.txt`
    pub file_name: String,
    /// MIME type of `body`
    pub content_type: &'static str,
    /// File content
    pub body: String,
}

impl TicketFile {
    /// Render `tokens` for `user_id`.
    #[must_use]
    pub fn render(user_id: UserId, tokens: &[TicketToken]) -> Self {
        let mut body = String::from("Your Tickets:\n");
        body.push_str(
            &tokens
                .iter()
                .map(TicketToken::as_str)
                .collect::<Vec<_>>()
                .join("\n"),
        );

        Self {
            file_name: format!("Tickets_{user_id}.txt"),
            content_type: "text/plain",
            body,
        }
    }
}

/// Exports issued tickets.
#[derive(Clone)]
pub struct TicketExport {
    store: Arc<dyn TicketStore>,
}

impl TicketExport {
    /// Create an exporter over `store`
    #[must_use]
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        Self { store }
    }

    /// Every token owned by `user_id`, in issue order.
    ///
    /// # Errors
    ///
    /// - `UserNotFound` if the user doesn't exist
    /// - `NoTicketsFound` if the user owns no tokens
    /// - `StorageUnavailable` if the store can't be read
    pub async fn tokens_for(&self, user_id: UserId) -> Result<Vec<TicketToken>> {
        if self.store.find_user(user_id).await?.is_none() {
            return Err(TicketingError::UserNotFound(user_id));
        }

        let tokens: Vec<_> = self
            .store
            .find_tokens_by_user_id(user_id)
            .await?
            .into_iter()
            .map(|row| row.token)
            .collect();

        if tokens.is_empty() {
            return Err(TicketingError::NoTicketsFound(user_id));
        }
        Ok(tokens)
    }

    /// Render the user's tickets as a text file.
    ///
    /// # Errors
    ///
    /// Same as [`tokens_for`](Self::tokens_for).
    pub async fn export(&self, user_id: UserId) -> Result<TicketFile> {
        let tokens = self.tokens_for(user_id).await?;
        tracing::debug!(user_id = %user_id, tickets = tokens.len(), "Exporting tickets");
        Ok(TicketFile::render(user_id, &tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_render_layout() {
        let user_id = UserId::from_uuid(Uuid::nil());
        let file = TicketFile::render(
            user_id,
            &[TicketToken::new("SHA10600"), TicketToken::new("SHA10599")],
        );

        assert_eq!(
            file.file_name,
            "Tickets_00000000-0000-0000-0000-000000000000.txt"
        );
        assert_eq!(file.content_type, "text/plain");
        assert_eq!(file.body, "Your Tickets:\nSHA10600\nSHA10599");
    }
}
