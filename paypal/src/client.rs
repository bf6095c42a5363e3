//! `PayPal` REST client implementation

use crate::error::PayPalError;
use crate::models::{
    AccessToken, Amount, CreatePayment, ExecutePayment, Payer, Payment, RedirectUrls, Transaction,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use ticketbooth_core::provider::{
    CreatedPayment, PaymentProvider, PaymentRequest, PaymentState, ProviderPayment,
};
use ticketbooth_core::types::{PaymentId, UserId};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Sandbox REST endpoint
pub const SANDBOX_API_URL: &str = "https://api-m.sandbox.paypal.com";

/// Live REST endpoint
pub const LIVE_API_URL: &str = "https://api-m.paypal.com";

/// Refresh tokens this long before `PayPal` says they expire
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Clone, Debug)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// `PayPal` payments v1 client
#[derive(Clone)]
pub struct PayPalClient {
    client: Client,
    client_id: String,
    client_secret: String,
    api_url: String,
    token: Arc<Mutex<Option<CachedToken>>>,
}

impl PayPalClient {
    /// Create a client from `PAYPAL_CLIENT_ID`, `PAYPAL_CLIENT_SECRET` and
    /// optional `PAYPAL_API_URL` (sandbox by default)
    ///
    /// # Errors
    ///
    /// Returns `PayPalError::MissingCredentials` if a credential is not set
    pub fn from_env() -> Result<Self, PayPalError> {
        let client_id = std::env::var("PAYPAL_CLIENT_ID")
            .map_err(|_| PayPalError::MissingCredentials("PAYPAL_CLIENT_ID"))?;
        let client_secret = std::env::var("PAYPAL_CLIENT_SECRET")
            .map_err(|_| PayPalError::MissingCredentials("PAYPAL_CLIENT_SECRET"))?;
        let api_url =
            std::env::var("PAYPAL_API_URL").unwrap_or_else(|_| SANDBOX_API_URL.to_string());

        Ok(Self::new(client_id, client_secret, api_url))
    }

    /// Create a client with explicit credentials
    #[must_use]
    pub fn new(client_id: String, client_secret: String, api_url: String) -> Self {
        Self::with_http_client(Client::new(), client_id, client_secret, api_url)
    }

    /// Create a client whose requests give up after `timeout`
    ///
    /// # Errors
    ///
    /// Returns `PayPalError::ClientSetup` if the HTTP client can't be built
    pub fn with_timeout(
        client_id: String,
        client_secret: String,
        api_url: String,
        timeout: std::time::Duration,
    ) -> Result<Self, PayPalError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PayPalError::ClientSetup(e.to_string()))?;
        Ok(Self::with_http_client(client, client_id, client_secret, api_url))
    }

    fn with_http_client(
        client: Client,
        client_id: String,
        client_secret: String,
        api_url: String,
    ) -> Self {
        Self {
            client,
            client_id,
            client_secret,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: Arc::new(Mutex::new(None)),
        }
    }

    /// Base URL requests are sent to
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Bearer token, fetched with the client-credentials grant and cached
    /// until shortly before it expires
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, rejected credentials, or parsing failures
    pub async fn access_token(&self) -> Result<String, PayPalError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Utc::now() {
                return Ok(token.value.clone());
            }
        }

        let response = self
            .client
            .post(format!("{}/v1/oauth2/token", self.api_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header("Accept", "application/json")
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| PayPalError::RequestFailed(e.to_string()))?;

        let token: AccessToken = match response.status() {
            StatusCode::OK => response
                .json()
                .await
                .map_err(|e| PayPalError::ResponseParseFailed(e.to_string()))?,
            StatusCode::UNAUTHORIZED => return Err(PayPalError::Unauthorized),
            status => {
                let body = response.text().await.unwrap_or_default();
                return Err(PayPalError::ApiError {
                    status: status.as_u16(),
                    message: body,
                });
            }
        };

        tracing::debug!(expires_in = token.expires_in, "Obtained PayPal access token");
        let lifetime = (token.expires_in - TOKEN_EXPIRY_MARGIN_SECS).max(0);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Utc::now() + Duration::seconds(lifetime),
        });

        Ok(token.access_token)
    }

    /// Create a sale payment
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, API errors, or parsing failures
    pub async fn create(&self, body: &CreatePayment) -> Result<Payment, PayPalError> {
        let request = self
            .client
            .post(format!("{}/v1/payments/payment", self.api_url))
            .json(body);
        self.send(request, None).await
    }

    /// Look up a payment
    ///
    /// # Errors
    ///
    /// Returns `PayPalError::PaymentNotFound` for unknown ids, and errors for
    /// network failures, API errors, or parsing failures
    pub async fn get(&self, payment_id: &str) -> Result<Payment, PayPalError> {
        let request = self
            .client
            .get(format!("{}/v1/payments/payment/{payment_id}", self.api_url));
        self.send(request, Some(payment_id)).await
    }

    /// Execute an approved payment
    ///
    /// # Errors
    ///
    /// Returns `PayPalError::PaymentNotFound` for unknown ids, and errors for
    /// network failures, API errors, or parsing failures
    pub async fn execute(&self, payment_id: &str, payer_id: &str) -> Result<Payment, PayPalError> {
        let request = self
            .client
            .post(format!(
                "{}/v1/payments/payment/{payment_id}/execute",
                self.api_url
            ))
            .json(&ExecutePayment {
                payer_id: payer_id.to_string(),
            });
        self.send(request, Some(payment_id)).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        payment_id: Option<&str>,
    ) -> Result<T, PayPalError> {
        let token = self.access_token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| PayPalError::RequestFailed(e.to_string()))?;

        match (response.status(), payment_id) {
            (StatusCode::OK | StatusCode::CREATED, _) => response
                .json::<T>()
                .await
                .map_err(|e| PayPalError::ResponseParseFailed(e.to_string())),
            (StatusCode::UNAUTHORIZED, _) => {
                // Token revoked early: forget it so the next call fetches a new one
                *self.token.lock().await = None;
                Err(PayPalError::Unauthorized)
            }
            (StatusCode::NOT_FOUND, Some(payment_id)) => {
                Err(PayPalError::PaymentNotFound(payment_id.to_string()))
            }
            (status, _) => {
                let body = response.text().await.unwrap_or_default();
                Err(PayPalError::ApiError {
                    status: status.as_u16(),
                    message: body,
                })
            }
        }
    }
}

/// Build the v1 sale body for `request`
#[must_use]
pub fn sale_body(request: &PaymentRequest) -> CreatePayment {
    CreatePayment {
        intent: "sale".to_string(),
        payer: Payer {
            payment_method: "paypal".to_string(),
        },
        transactions: vec![Transaction {
            amount: Amount {
                total: request.amount.to_decimal_string(),
                currency: request.currency.clone(),
            },
            description: Some(request.description.clone()),
            custom: Some(request.user_id.to_string()),
        }],
        redirect_urls: RedirectUrls {
            return_url: request.return_url.clone(),
            cancel_url: request.cancel_url.clone(),
        },
    }
}

// v1 reports an executed sale as `approved`
fn provider_payment(payment: &Payment) -> ProviderPayment {
    let state = match payment.state.as_str() {
        "created" => PaymentState::Created,
        "approved" => PaymentState::Completed,
        other => PaymentState::Other(other.to_string()),
    };
    ProviderPayment {
        payment_id: PaymentId::new(payment.id.clone()),
        state,
        user_id: payment
            .custom()
            .and_then(|custom| Uuid::parse_str(custom).ok())
            .map(UserId::from_uuid),
    }
}

#[async_trait]
impl PaymentProvider for PayPalClient {
    async fn create_payment(&self, request: &PaymentRequest) -> ticketbooth_core::Result<CreatedPayment> {
        let payment = self.create(&sale_body(request)).await?;

        let approval_url = payment
            .link("approval_url")
            .ok_or_else(|| PayPalError::MissingApprovalUrl(payment.id.clone()))?
            .to_string();

        Ok(CreatedPayment {
            payment_id: PaymentId::new(payment.id),
            approval_url,
        })
    }

    async fn lookup_payment(
        &self,
        payment_id: &PaymentId,
    ) -> ticketbooth_core::Result<ProviderPayment> {
        let payment = self.get(payment_id.as_str()).await?;
        Ok(provider_payment(&payment))
    }

    async fn execute_payment(
        &self,
        payment_id: &PaymentId,
        payer_id: &str,
    ) -> ticketbooth_core::Result<ProviderPayment> {
        tracing::info!(payment_id = %payment_id, "Executing approved PayPal payment");
        let payment = self.execute(payment_id.as_str(), payer_id).await?;
        Ok(provider_payment(&payment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticketbooth_core::Money;

    #[test]
    fn test_client_creation() {
        let client = PayPalClient::new(
            "id".to_string(),
            "secret".to_string(),
            format!("{SANDBOX_API_URL}/"),
        );
        assert_eq!(client.api_url(), SANDBOX_API_URL);
    }

    #[test]
    fn test_sale_body() {
        let user_id = UserId::new();
        let body = sale_body(&PaymentRequest {
            user_id,
            amount: Money::from_minor_units(3750),
            currency: "GBP".to_string(),
            description: "Registration Fee".to_string(),
            return_url: "https://shop.test/ok".to_string(),
            cancel_url: "https://shop.test/cancel".to_string(),
        });

        let json = serde_json::to_value(&body).unwrap_or_default();
        assert_eq!(json["intent"], "sale");
        assert_eq!(json["payer"]["payment_method"], "paypal");
        assert_eq!(json["transactions"][0]["amount"]["total"], "37.50");
        assert_eq!(json["transactions"][0]["amount"]["currency"], "GBP");
        assert_eq!(json["transactions"][0]["custom"], user_id.to_string());
        assert_eq!(json["redirect_urls"]["cancel_url"], "https://shop.test/cancel");
    }
}
