//! PayPal Orders v2 client.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use super::{CaptureOutcome, PaymentProvider, ProviderError, ProviderOrder};
use crate::domain::value_objects::Money;

pub const SANDBOX_API_URL: &str = "https://api-m.sandbox.paypal.com";

#[derive(Clone, Debug)]
pub struct PayPalCredentials {
    pub client_id: String,
    pub app_secret: String,
    pub api_url: String,
}

#[derive(Clone, Debug)]
pub struct PayPalClient {
    http: reqwest::Client,
    credentials: PayPalCredentials,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct OrderResponse {
    id: String,
    status: String,
}

#[derive(Deserialize)]
struct CaptureResponse {
    id: String,
    status: String,
    #[serde(default)]
    payer: Option<Payer>,
}

#[derive(Deserialize)]
struct Payer {
    #[serde(default)]
    email_address: Option<String>,
}

impl PayPalClient {
    pub fn new(credentials: PayPalCredentials) -> Self {
        Self { http: reqwest::Client::new(), credentials }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.credentials.api_url.trim_end_matches('/'))
    }

    async fn access_token(&self) -> Result<String, ProviderError> {
        let response = self
            .http
            .post(self.url("/v1/oauth2/token"))
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.app_secret))
            .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await?;
        let token: TokenResponse = read_json(response).await?;
        Ok(token.access_token)
    }
}

async fn read_json<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ProviderError::Api { status: status.as_u16(), body });
    }
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl PaymentProvider for PayPalClient {
    #[instrument(skip(self), fields(amount = %amount))]
    async fn create_order(&self, amount: &Money) -> Result<ProviderOrder, ProviderError> {
        let token = self.access_token().await?;
        let body = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "amount": { "currency_code": amount.currency(), "value": amount.round().amount().to_string() }
            }]
        });
        let response = self.http.post(self.url("/v2/checkout/orders")).bearer_auth(token).json(&body).send().await?;
        let order: OrderResponse = read_json(response).await?;
        tracing::info!(provider_order_id = %order.id, "paypal order created");
        Ok(ProviderOrder { id: order.id, status: order.status })
    }

    #[instrument(skip(self))]
    async fn capture_order(&self, provider_order_id: &str) -> Result<CaptureOutcome, ProviderError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .post(self.url(&format!("/v2/checkout/orders/{provider_order_id}/capture")))
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;
        let capture: CaptureResponse = read_json(response).await?;
        Ok(CaptureOutcome {
            id: capture.id,
            status: capture.status,
            email_address: capture.payer.and_then(|p| p.email_address).unwrap_or_default(),
        })
    }
}
