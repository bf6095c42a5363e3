//! `PayPal` REST v1 payment request and response bodies

use serde::{Deserialize, Serialize};

/// OAuth2 token response
#[derive(Clone, Debug, Deserialize)]
pub struct AccessToken {
    /// Bearer token
    pub access_token: String,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: i64,
}

/// `POST /v1/payments/payment` body
#[derive(Clone, Debug, Serialize)]
pub struct CreatePayment {
    /// Always `sale`
    pub intent: String,
    /// Payment method
    pub payer: Payer,
    /// Exactly one transaction per registration
    pub transactions: Vec<Transaction>,
    /// Where `PayPal` sends the buyer back
    pub redirect_urls: RedirectUrls,
}

/// Payer block
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Payer {
    /// Always `paypal`
    pub payment_method: String,
}

/// One transaction of a payment
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    /// Total charged
    pub amount: Amount,
    /// Line shown to the buyer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Free-form field carrying our user id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<String>,
}

/// Amount with a decimal total, e.g. `"37.50"`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Amount {
    /// Decimal total
    pub total: String,
    /// ISO 4217 currency code
    pub currency: String,
}

/// Redirect URLs
#[derive(Clone, Debug, Serialize)]
pub struct RedirectUrls {
    /// After approval
    pub return_url: String,
    /// After cancellation
    pub cancel_url: String,
}

/// `POST /v1/payments/payment/{id}/execute` body
#[derive(Clone, Debug, Serialize)]
pub struct ExecutePayment {
    /// Payer id from the return URL
    pub payer_id: String,
}

/// Payment resource as returned by create, get and execute
#[derive(Clone, Debug, Deserialize)]
pub struct Payment {
    /// `PAY-...` id
    pub id: String,
    /// `created`, `approved` or `failed`
    #[serde(default)]
    pub state: String,
    /// Transactions
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    /// HATEOAS links
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Payment {
    /// `href` of the link with relation `rel`
    #[must_use]
    pub fn link(&self, rel: &str) -> Option<&str> {
        self.links
            .iter()
            .find(|link| link.rel == rel)
            .map(|link| link.href.as_str())
    }

    /// `custom` field of the first transaction
    #[must_use]
    pub fn custom(&self) -> Option<&str> {
        self.transactions.first().and_then(|t| t.custom.as_deref())
    }
}

/// HATEOAS link
#[derive(Clone, Debug, Deserialize)]
pub struct Link {
    /// Target URL
    pub href: String,
    /// Relation, e.g. `approval_url`
    pub rel: String,
    /// HTTP method
    #[serde(default)]
    pub method: Option<String>,
}
