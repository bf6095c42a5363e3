//! Domain types for the ticket shop.
//!
//! Identifiers, the registration record, issued ticket tokens, money and capacity.

use crate::error::{Result, TicketingError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a registered user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier assigned to a payment by the external provider.
///
/// Opaque to us (`PAY-1AB23456CD789012EF34GHIJ` for `PayPal`). Shared by every
/// token issued from the same payment.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(String);

impl PaymentId {
    /// Longest identifier accepted from a provider callback.
    pub const MAX_LEN: usize = 128;

    /// Wrap a provider payment id without validation.
    ///
    /// Use [`PaymentId::parse`] for values that come from a request.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Validate and wrap a provider payment id taken from untrusted input.
    ///
    /// # Errors
    ///
    /// Returns [`TicketingError::Validation`] if the id is blank, longer than
    /// [`PaymentId::MAX_LEN`], or contains anything but ASCII letters, digits,
    /// `-` and `_`.
    pub fn parse(id: &str) -> Result<Self> {
        let id = id.trim();
        if id.is_empty() {
            return Err(TicketingError::Validation("paymentId is required".to_string()));
        }
        if id.len() > Self::MAX_LEN {
            return Err(TicketingError::Validation(format!(
                "paymentId must be at most {} characters",
                Self::MAX_LEN
            )));
        }
        if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(TicketingError::Validation(
                "paymentId contains invalid characters".to_string(),
            ));
        }
        Ok(Self(id.to_string()))
    }

    /// Borrow the raw identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One ticket, as presented by the holder at the door.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketToken(String);

impl TicketToken {
    /// Wrap a token string
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Borrow the token string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the token string
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TicketToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Registration & Users
// ============================================================================

/// Registration form submitted by a prospective attendee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    /// Title (Mr, Mrs, Dr, ...)
    pub title: String,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Contact email
    pub email: String,
    /// Contact phone number
    pub phone_number: String,
    /// Age in years
    pub age: u8,
    /// Gender
    pub gender: String,
    /// Tickets requested
    pub number_of_tickets: u32,
    /// Address line 1
    pub address1: String,
    /// Address line 2
    #[serde(default)]
    pub address2: Option<String>,
    /// City
    pub city: String,
    /// Post code
    pub post_code: String,
}

impl Registration {
    /// Check the form before any inventory is consulted.
    ///
    /// # Errors
    ///
    /// Returns [`TicketingError::Validation`] naming the first invalid field.
    pub fn validate(&self, max_tickets_per_order: u32) -> Result<()> {
        if self.number_of_tickets == 0 {
            return Err(TicketingError::Validation(
                "numberOfTickets must be at least 1".to_string(),
            ));
        }
        if self.number_of_tickets > max_tickets_per_order {
            return Err(TicketingError::Validation(format!(
                "numberOfTickets must be at most {max_tickets_per_order}"
            )));
        }
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(TicketingError::Validation(
                "firstName and lastName are required".to_string(),
            ));
        }
        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => {
                return Err(TicketingError::Validation(format!(
                    "email '{email}' is not a valid address"
                )));
            }
        }
        if !(1..=130).contains(&self.age) {
            return Err(TicketingError::Validation(
                "age must be between 1 and 130".to_string(),
            ));
        }
        Ok(())
    }
}

/// A registered attendee.
///
/// Created once at registration and never modified afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User ID
    pub id: UserId,
    /// Title (Mr, Mrs, Dr, ...)
    pub title: String,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Contact email
    pub email: String,
    /// Contact phone number
    pub phone_number: String,
    /// Age in years
    pub age: u8,
    /// Gender
    pub gender: String,
    /// Tickets requested at registration time (always >= 1)
    pub number_of_tickets: u32,
    /// Address line 1
    pub address1: String,
    /// Address line 2
    pub address2: Option<String>,
    /// City
    pub city: String,
    /// Post code
    pub post_code: String,
    /// When the user registered
    pub registered_at: DateTime<Utc>,
}

impl User {
    /// Build the persisted user from an accepted registration.
    #[must_use]
    pub fn from_registration(
        id: UserId,
        registration: Registration,
        registered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title: registration.title,
            first_name: registration.first_name.trim().to_string(),
            last_name: registration.last_name.trim().to_string(),
            email: registration.email.trim().to_string(),
            phone_number: registration.phone_number,
            age: registration.age,
            gender: registration.gender,
            number_of_tickets: registration.number_of_tickets,
            address1: registration.address1,
            address2: registration.address2,
            city: registration.city,
            post_code: registration.post_code,
            registered_at,
        }
    }

    /// Display name, `"First Last"`
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// ============================================================================
// Issued tickets
// ============================================================================

/// One issued ticket row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentToken {
    /// Owner of the ticket
    pub user_id: UserId,
    /// Ticket token
    pub token: TicketToken,
    /// Payment this ticket was issued from
    pub payment_id: PaymentId,
    /// When the ticket was issued
    pub issued_at: DateTime<Utc>,
}

// ============================================================================
// Money & Capacity
// ============================================================================

/// Amount of money in minor units (pence, cents).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Create from minor units
    #[must_use]
    pub const fn from_minor_units(minor: u64) -> Self {
        Self(minor)
    }

    /// Amount in minor units
    #[must_use]
    pub const fn minor_units(&self) -> u64 {
        self.0
    }

    /// Parse a decimal amount such as `"25"`, `"25.5"` or `"25.00"`.
    ///
    /// # Errors
    ///
    /// Returns [`TicketingError::Validation`] for negative amounts, more than two
    /// decimal places, or anything that is not a plain decimal number.
    pub fn parse_decimal(value: &str) -> Result<Self> {
        let invalid = || TicketingError::Validation(format!("'{value}' is not a valid amount"));
        let value = value.trim();
        let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
        if whole.is_empty() || fraction.len() > 2 {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }
        let whole: u64 = whole.parse().map_err(|_| invalid())?;
        let fraction: u64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<u64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };
        whole
            .checked_mul(100)
            .and_then(|minor| minor.checked_add(fraction))
            .map(Self)
            .ok_or_else(invalid)
    }

    /// Multiply by a quantity, `None` on overflow
    #[must_use]
    pub fn checked_mul(self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(u64::from(quantity)).map(Self)
    }

    /// Two-decimal representation expected by payment providers (`"75.00"`)
    #[must_use]
    pub fn to_decimal_string(&self) -> String {
        format!("{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}

/// Total number of sellable tickets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacity(u64);

impl Capacity {
    /// Create a capacity
    #[must_use]
    pub const fn new(tickets: u64) -> Self {
        Self(tickets)
    }

    /// Total sellable tickets
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Tickets left after `issued` have been sold. Never negative.
    #[must_use]
    pub const fn remaining(&self, issued: u64) -> u64 {
        self.0.saturating_sub(issued)
    }

    /// Admission decision: can `requested` more tickets be sold on top of `issued`?
    ///
    /// # Errors
    ///
    /// Returns [`TicketingError::CapacityExceeded`] with the shortfall when they can't.
    pub fn admit(&self, issued: u64, requested: u32) -> Result<()> {
        let remaining = self.remaining(issued);
        let requested = u64::from(requested);
        if requested > remaining {
            return Err(TicketingError::CapacityExceeded {
                requested,
                remaining,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn registration(tickets: u32) -> Registration {
        Registration {
            title: "Ms".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone_number: "07700 900123".to_string(),
            age: 36,
            gender: "Female".to_string(),
            number_of_tickets: tickets,
            address1: "12 St James's Square".to_string(),
            address2: None,
            city: "London".to_string(),
            post_code: "SW1Y 4JH".to_string(),
        }
    }

    #[test]
    fn test_capacity_remaining_saturates() {
        let capacity = Capacity::new(5);
        assert_eq!(capacity.remaining(3), 2);
        assert_eq!(capacity.remaining(5), 0);
        assert_eq!(capacity.remaining(9), 0);
    }

    #[test]
    fn test_capacity_admit_reports_shortfall() {
        let capacity = Capacity::new(5);
        assert!(capacity.admit(0, 5).is_ok());
        assert_eq!(
            capacity.admit(5, 1),
            Err(TicketingError::CapacityExceeded {
                requested: 1,
                remaining: 0
            })
        );
        assert_eq!(
            capacity.admit(2, 4),
            Err(TicketingError::CapacityExceeded {
                requested: 4,
                remaining: 3
            })
        );
    }

    #[test]
    fn test_money_parse_decimal() {
        assert_eq!(Money::parse_decimal("25").unwrap().minor_units(), 2500);
        assert_eq!(Money::parse_decimal("25.5").unwrap().minor_units(), 2550);
        assert_eq!(Money::parse_decimal(" 25.05 ").unwrap().minor_units(), 2505);
        assert!(Money::parse_decimal("-1.00").is_err());
        assert!(Money::parse_decimal("1.005").is_err());
        assert!(Money::parse_decimal("abc").is_err());
        assert!(Money::parse_decimal(".50").is_err());
    }

    #[test]
    fn test_money_formats_two_decimals() {
        let price = Money::parse_decimal("25.5").unwrap();
        assert_eq!(price.checked_mul(3).unwrap().to_decimal_string(), "76.50");
        assert_eq!(Money::from_minor_units(7).to_string(), "0.07");
    }

    #[test]
    fn test_payment_id_parse() {
        assert_eq!(PaymentId::parse(" PAY-123 ").unwrap().as_str(), "PAY-123");
        assert!(PaymentId::parse("").is_err());
        assert!(PaymentId::parse("PAY 123").is_err());
        assert!(PaymentId::parse("PAY-1/../x").is_err());
        assert!(PaymentId::parse(&"x".repeat(PaymentId::MAX_LEN + 1)).is_err());
    }

    #[test]
    fn test_registration_validation() {
        assert!(registration(2).validate(10).is_ok());
        assert!(matches!(
            registration(0).validate(10),
            Err(TicketingError::Validation(_))
        ));
        assert!(matches!(
            registration(11).validate(10),
            Err(TicketingError::Validation(_))
        ));

        let mut bad_email = registration(1);
        bad_email.email = "ada.example.com".to_string();
        assert!(bad_email.validate(10).is_err());

        let mut no_name = registration(1);
        no_name.first_name = "  ".to_string();
        assert!(no_name.validate(10).is_err());
    }

    #[test]
    fn test_registration_deserializes_camel_case() {
        let json = r#"{
            "title": "Mr", "firstName": "Alan", "lastName": "Turing",
            "email": "alan@example.com", "phoneNumber": "0161 496 0000",
            "age": 41, "gender": "Male", "numberOfTickets": 3,
            "address1": "Hollymeade", "city": "Wilmslow", "postCode": "SK9 1AA"
        }"#;
        let registration: Registration = serde_json::from_str(json).unwrap();
        assert_eq!(registration.number_of_tickets, 3);
        assert_eq!(registration.address2, None);
    }
}
