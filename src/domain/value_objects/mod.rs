//! Value Objects for the storefront

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use validator::Validate;

/// URL-safe product handle: lowercase ascii letters, digits and single dashes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    pub const MAX_LEN: usize = 100;

    pub fn new(value: impl Into<String>) -> Result<Self, SlugError> {
        let value = value.into().trim().to_lowercase();
        if value.is_empty() { return Err(SlugError::Empty); }
        if value.len() > Self::MAX_LEN { return Err(SlugError::TooLong); }
        if value.starts_with('-') || value.ends_with('-') || value.contains("--") { return Err(SlugError::Malformed(value)); }
        if let Some(c) = value.chars().find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')) {
            return Err(SlugError::InvalidChar(c));
        }
        Ok(Self(value))
    }

    /// Derives a slug from a display name, e.g. `"Polo Shirt"` becomes `polo-shirt`.
    pub fn from_name(name: &str) -> Result<Self, SlugError> {
        let mut slug = String::with_capacity(name.len());
        for c in name.trim().to_lowercase().chars() {
            if c.is_ascii_alphanumeric() { slug.push(c); }
            else if !slug.is_empty() && !slug.ends_with('-') { slug.push('-'); }
        }
        Self::new(slug.trim_end_matches('-'))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl TryFrom<String> for Slug {
    type Error = SlugError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self { slug.0 }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlugError {
    #[error("slug is empty")]
    Empty,
    #[error("slug is longer than {} characters", Slug::MAX_LEN)]
    TooLong,
    #[error("slug contains invalid character {0:?}")]
    InvalidChar(char),
    #[error("slug {0:?} has leading, trailing or repeated dashes")]
    Malformed(String),
}

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_uppercase() } }
    pub fn usd(amount: Decimal) -> Self { Self::new(amount, "USD") }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn is_negative(&self) -> bool { self.amount.is_sign_negative() && !self.amount.is_zero() }

    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch { left: self.currency.clone(), right: other.currency.clone() });
        }
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }

    pub fn multiply(&self, qty: u32) -> Money { Money::new(self.amount * Decimal::from(qty), &self.currency) }

    /// Scales by a rate such as `0.15` for a 15% tax.
    pub fn scale(&self, rate: Decimal) -> Money { Money::new(self.amount * rate, &self.currency) }

    /// Rounds to cents, halves away from zero.
    pub fn round(&self) -> Money {
        Money::new(self.amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero), &self.currency)
    }

    /// Splits the amount into whole and fractional digits for display, `12.5` gives `("12", "50")`.
    pub fn parts(&self) -> (String, String) {
        let text = format!("{:.2}", self.round().amount);
        match text.split_once('.') {
            Some((whole, frac)) => (whole.to_string(), frac.to_string()),
            None => (text, "00".to_string()),
        }
    }

    /// Sums line amounts, all of which must share `currency`.
    pub fn sum<'a>(currency: &str, amounts: impl IntoIterator<Item = &'a Money>) -> Result<Money, MoneyError> {
        amounts.into_iter().try_fold(Money::zero(currency), |acc, m| acc.add(m))
    }
}

impl Default for Money { fn default() -> Self { Self::zero("USD") } }

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (whole, frac) = self.parts();
        match self.currency.as_str() {
            "USD" => write!(f, "${whole}.{frac}"),
            other => write!(f, "{whole}.{frac} {other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: String, right: String },
}

/// Quantity value object
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Self { Self(value) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn add(&self, other: u32) -> Self { Self(self.0.saturating_add(other)) }
    pub fn subtract(&self, other: u32) -> Option<Self> {
        if other > self.0 { None } else { Some(Self(self.0 - other)) }
    }
    pub fn saturating_subtract(&self, other: u32) -> Self { Self(self.0.saturating_sub(other)) }
    pub fn is_zero(&self) -> bool { self.0 == 0 }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    PayPal,
    CashOnDelivery,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self { Self::PayPal => "PayPal", Self::CashOnDelivery => "CashOnDelivery" }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for PaymentMethod {
    type Err = UnknownPaymentMethod;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PayPal" => Ok(Self::PayPal),
            "CashOnDelivery" => Ok(Self::CashOnDelivery),
            other => Err(UnknownPaymentMethod(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("unknown payment method {0:?}")]
pub struct UnknownPaymentMethod(pub String);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ShippingAddress {
    #[validate(length(min = 3, message = "Name must be at least 3 characters"))]
    pub full_name: String,
    #[validate(length(min = 3, message = "Address must be at least 3 characters"))]
    pub street_address: String,
    #[validate(length(min = 3, message = "City must be at least 3 characters"))]
    pub city: String,
    #[validate(length(min = 3, message = "Postal code must be at least 3 characters"))]
    pub postal_code: String,
    #[validate(length(min = 3, message = "Country must be at least 3 characters"))]
    pub country: String,
}
