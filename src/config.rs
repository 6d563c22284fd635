//! Environment configuration.

use std::str::FromStr;
use thiserror::Error;

use crate::domain::pricing::PricingPolicy;
use crate::payments::{PayPalCredentials, SANDBOX_API_URL};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Shop rules handed to the services.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShopSettings {
    pub currency: String,
    pub pricing: PricingPolicy,
    pub page_size: u32,
    pub latest_limit: u32,
}

impl Default for ShopSettings {
    fn default() -> Self {
        Self { currency: "USD".into(), pricing: PricingPolicy::default(), page_size: 12, latest_limit: 4 }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub nats_url: Option<String>,
    pub paypal: Option<PayPalCredentials>,
    pub shop: ShopSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> { Self::from_lookup(|name| std::env::var(name).ok()) }

    /// Builds the config from any variable source; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = ShopSettings::default();

        let paypal = match (var("PAYPAL_CLIENT_ID"), var("PAYPAL_APP_SECRET")) {
            (Some(client_id), Some(app_secret)) => Some(PayPalCredentials {
                client_id,
                app_secret,
                api_url: var("PAYPAL_API_URL").unwrap_or_else(|| SANDBOX_API_URL.to_string()),
            }),
            _ => None,
        };
        let free_shipping_threshold = match var("FREE_SHIPPING_THRESHOLD").as_deref() {
            Some("none") => None,
            Some(value) => Some(parse("FREE_SHIPPING_THRESHOLD", value)?),
            None => defaults.pricing.free_shipping_threshold,
        };
        let page_size: u32 = parse_or(&var, "PAGE_SIZE", defaults.page_size)?;
        if page_size == 0 {
            return Err(ConfigError::Invalid { name: "PAGE_SIZE", value: "0".into() });
        }

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&var, "PORT", 8083)?,
            database_url: var("DATABASE_URL"),
            database_max_connections: parse_or(&var, "DATABASE_MAX_CONNECTIONS", 10)?,
            nats_url: var("NATS_URL"),
            paypal,
            shop: ShopSettings {
                currency: var("CURRENCY").map(|c| c.to_uppercase()).unwrap_or(defaults.currency),
                pricing: PricingPolicy {
                    tax_rate: parse_or(&var, "TAX_RATE", defaults.pricing.tax_rate)?,
                    shipping_price: parse_or(&var, "SHIPPING_PRICE", defaults.pricing.shipping_price)?,
                    free_shipping_threshold,
                },
                page_size,
                latest_limit: parse_or(&var, "LATEST_PRODUCTS_LIMIT", defaults.latest_limit)?,
            },
        })
    }

    pub fn bind_addr(&self) -> String { format!("{}:{}", self.host, self.port) }
}

fn parse<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid { name, value: value.to_string() })
}

fn parse_or<T: FromStr>(var: &impl Fn(&str) -> Option<String>, name: &'static str, default: T) -> Result<T, ConfigError> {
    var(name).map_or(Ok(default), |value| parse(name, &value))
}
