//! Ticket token generation.
//!
//! Generators are pure: the same payment and count always give the same tokens,
//! so a reconciliation retried after a failed write produces an identical batch.

use crate::types::{PaymentId, TicketToken};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// Derives the tokens for one payment.
pub trait TokenGenerator: Send + Sync {
    /// Generate `count` distinct tokens for `payment_id`.
    fn generate(&self, payment_id: &PaymentId, count: u32) -> Vec<TicketToken>;
}

/// Legacy decrementing scheme: `SHA10600`, `SHA10599`, ...
///
/// Distinct within a batch but identical for every payment of the same size,
/// so uniqueness across payments relies entirely on the store.
#[derive(Clone, Copy, Debug)]
pub struct SequentialTokenGenerator {
    start: i64,
}

impl SequentialTokenGenerator {
    /// First number handed out by the legacy scheme.
    pub const LEGACY_START: i64 = 10_600;

    /// Start counting down from `start`
    #[must_use]
    pub const fn new(start: i64) -> Self {
        Self { start }
    }
}

impl Default for SequentialTokenGenerator {
    fn default() -> Self {
        Self::new(Self::LEGACY_START)
    }
}

impl TokenGenerator for SequentialTokenGenerator {
    fn generate(&self, _payment_id: &PaymentId, count: u32) -> Vec<TicketToken> {
        (0..i64::from(count))
            .map(|i| TicketToken::new(format!("SHA{}", self.start - i)))
            .collect()
    }
}

/// Content-derived scheme: `SHA` + the first 12 bytes of
/// `SHA-256("{payment_id}:{index}")` in upper-case hex.
#[derive(Clone, Copy, Debug, Default)]
pub struct DigestTokenGenerator;

impl DigestTokenGenerator {
    const DIGEST_BYTES: usize = 12;
}

impl TokenGenerator for DigestTokenGenerator {
    fn generate(&self, payment_id: &PaymentId, count: u32) -> Vec<TicketToken> {
        (0..count)
            .map(|index| {
                let digest = Sha256::digest(format!("{payment_id}:{index}").as_bytes());
                let mut token = String::with_capacity(3 + Self::DIGEST_BYTES * 2);
                token.push_str("SHA");
                for byte in &digest[..Self::DIGEST_BYTES] {
                    let _ = write!(token, "{byte:02X}");
                }
                TicketToken::new(token)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn strings(tokens: Vec<TicketToken>) -> Vec<String> {
        tokens.into_iter().map(TicketToken::into_inner).collect()
    }

    #[test]
    fn test_sequential_matches_legacy_scheme() {
        let tokens = SequentialTokenGenerator::default().generate(&PaymentId::new("P1"), 3);
        assert_eq!(strings(tokens), vec!["SHA10600", "SHA10599", "SHA10598"]);
    }

    #[test]
    fn test_sequential_ignores_payment() {
        let generator = SequentialTokenGenerator::default();
        assert_eq!(
            generator.generate(&PaymentId::new("P1"), 2),
            generator.generate(&PaymentId::new("P2"), 2)
        );
    }

    #[test]
    fn test_digest_is_deterministic_and_distinct() {
        let generator = DigestTokenGenerator;
        let first = generator.generate(&PaymentId::new("PAY-1"), 5);
        let again = generator.generate(&PaymentId::new("PAY-1"), 5);
        assert_eq!(first, again);

        let unique: HashSet<_> = first.iter().collect();
        assert_eq!(unique.len(), 5);

        for token in &first {
            assert!(token.as_str().starts_with("SHA"));
            assert_eq!(token.as_str().len(), 27);
        }
    }

    #[test]
    fn test_digest_differs_between_payments() {
        let generator = DigestTokenGenerator;
        let a: HashSet<_> = generator.generate(&PaymentId::new("PAY-1"), 10).into_iter().collect();
        let b: HashSet<_> = generator.generate(&PaymentId::new("PAY-2"), 10).into_iter().collect();
        assert!(a.is_disjoint(&b));
    }

    #[test]
    fn test_zero_count_is_empty() {
        assert!(DigestTokenGenerator.generate(&PaymentId::new("P"), 0).is_empty());
        assert!(SequentialTokenGenerator::default().generate(&PaymentId::new("P"), 0).is_empty());
    }
}
