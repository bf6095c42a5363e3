//! Ticket sale settings.
//!
//! Passed explicitly into every service so behaviour never depends on ambient
//! process state. The server binary builds this from environment variables.

use crate::error::TicketingError;
use crate::tokens::{DigestTokenGenerator, SequentialTokenGenerator, TokenGenerator};
use crate::types::{Capacity, Money};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// How ticket tokens are derived.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenScheme {
    /// `SHA` + hex digest of `payment_id:index`. Unique across payments.
    #[default]
    Digest,
    /// Legacy `SHA10600`, `SHA10599`, ... Collides across payments; the store's
    /// unique constraint rejects the second payment that produces the same tokens.
    Sequential,
}

impl TokenScheme {
    /// Generator implementing this scheme
    #[must_use]
    pub fn generator(self) -> Arc<dyn TokenGenerator> {
        match self {
            Self::Digest => Arc::new(DigestTokenGenerator),
            Self::Sequential => Arc::new(SequentialTokenGenerator::default()),
        }
    }
}

impl FromStr for TokenScheme {
    type Err = TicketingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "digest" => Ok(Self::Digest),
            "sequential" => Ok(Self::Sequential),
            other => Err(TicketingError::Validation(format!(
                "unknown token scheme '{other}' (expected 'digest' or 'sequential')"
            ))),
        }
    }
}

impl fmt::Display for TokenScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Digest => f.write_str("digest"),
            Self::Sequential => f.write_str("sequential"),
        }
    }
}

/// Ticket sale configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketConfig {
    /// Total sellable tickets
    pub capacity: Capacity,
    /// Price of one ticket
    pub ticket_price: Money,
    /// ISO 4217 currency code sent to the payment provider
    pub currency: String,
    /// Largest quantity a single registration may request
    pub max_tickets_per_order: u32,
    /// Token derivation scheme
    pub token_scheme: TokenScheme,
}

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            capacity: Capacity::new(100),
            ticket_price: Money::from_minor_units(2500),
            currency: "GBP".to_string(),
            max_tickets_per_order: 10,
            token_scheme: TokenScheme::Digest,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_token_scheme_from_str() {
        assert_eq!("digest".parse::<TokenScheme>().unwrap(), TokenScheme::Digest);
        assert_eq!(" Sequential ".parse::<TokenScheme>().unwrap(), TokenScheme::Sequential);
        assert!("random".parse::<TokenScheme>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = TicketConfig::default();
        assert_eq!(config.capacity.get(), 100);
        assert_eq!(config.ticket_price.to_decimal_string(), "25.00");
        assert_eq!(config.currency, "GBP");
        assert_eq!(config.token_scheme, TokenScheme::Digest);
    }
}
