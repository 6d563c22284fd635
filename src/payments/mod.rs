//! Payment provider seam.

mod paypal;

pub use paypal::{PayPalClient, PayPalCredentials, SANDBOX_API_URL};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::value_objects::Money;

/// An order opened on the provider side, awaiting buyer approval.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderOrder {
    pub id: String,
    pub status: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureOutcome {
    pub id: String,
    pub status: String,
    pub email_address: String,
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("payment provider is not configured")]
    NotConfigured,

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_order(&self, amount: &Money) -> Result<ProviderOrder, ProviderError>;
    async fn capture_order(&self, provider_order_id: &str) -> Result<CaptureOutcome, ProviderError>;
}

/// Used when no provider credentials are configured; cash on delivery still works.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledProvider;

#[async_trait]
impl PaymentProvider for DisabledProvider {
    async fn create_order(&self, _amount: &Money) -> Result<ProviderOrder, ProviderError> {
        Err(ProviderError::NotConfigured)
    }

    async fn capture_order(&self, _provider_order_id: &str) -> Result<CaptureOutcome, ProviderError> {
        Err(ProviderError::NotConfigured)
    }
}
