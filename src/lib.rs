//! Storefront order & payment core
//!
//! Backend for a small web shop: catalog browsing, cart, checkout, payment capture and fulfillment.
//!
//! ## Features
//! - Product catalog with admin management
//! - Per-user shopping cart with price snapshots
//! - Order placement with tax and shipping policy
//! - Payment via PayPal capture or cash-on-delivery confirmation
//! - Delivery tracking and admin order listing
//! - User profile, shipping address and payment preference

pub mod action;
pub mod api;
pub mod config;
pub mod domain;
pub mod notify;
pub mod pagination;
pub mod payments;
pub mod policy;
pub mod services;
pub mod store;

#[cfg(test)]
mod test_support;

use thiserror::Error;
use validator::ValidationErrors;

use crate::domain::aggregates::{CartError, OrderError, ProductError};
use crate::domain::value_objects::{PaymentMethod, SlugError};
use crate::payments::ProviderError;

pub use action::ActionResult;
pub use policy::Actor;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("{0}")]
    Validation(String),

    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Your cart changed while the order was being placed")]
    CartChanged,

    #[error("No shipping address")]
    MissingAddress,

    #[error("No payment method")]
    MissingPaymentMethod,

    #[error("Product not found")]
    ProductNotFound,

    #[error("Order not found")]
    OrderNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Item not found in cart")]
    CartItemNotFound,

    #[error("User is not authorized")]
    Unauthorized,

    #[error("Order is already paid")]
    AlreadyPaid,

    #[error("Order is not paid")]
    OrderNotPaid,

    #[error("Order is already delivered")]
    AlreadyDelivered,

    #[error("Not enough stock: {available} available, {requested} requested")]
    InsufficientStock { available: u32, requested: u32 },

    #[error("{0} already exists")]
    Conflict(String),

    #[error("Order is to be paid by {0}")]
    WrongPaymentMethod(PaymentMethod),

    #[error("Payment was not completed (status {0:?})")]
    PaymentNotCompleted(String),

    #[error("Error in PayPal payment: capture {0} does not match this order")]
    PaymentMismatch(String),

    #[error("Payment provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Storage error: {0}")]
    Storage(#[source] sqlx::Error),
}

/// Coarse classification of failures, used to pick retry behaviour and HTTP status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Unauthorized,
    StateConflict,
    Upstream,
}

impl ErrorKind {
    pub fn status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::FORBIDDEN,
            Self::StateConflict => StatusCode::CONFLICT,
            Self::Upstream => StatusCode::BAD_GATEWAY,
        }
    }
}

impl StorefrontError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::MissingAddress | Self::MissingPaymentMethod => ErrorKind::Validation,
            Self::ProductNotFound | Self::OrderNotFound | Self::UserNotFound | Self::CartItemNotFound => ErrorKind::NotFound,
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::EmptyCart
            | Self::CartChanged
            | Self::WrongPaymentMethod(_)
            | Self::AlreadyPaid
            | Self::OrderNotPaid
            | Self::AlreadyDelivered
            | Self::InsufficientStock { .. }
            | Self::Conflict(_) => ErrorKind::StateConflict,
            Self::PaymentNotCompleted(_) | Self::PaymentMismatch(_) | Self::Provider(_) | Self::Storage(_) => ErrorKind::Upstream,
        }
    }

    /// Message safe to show to a shopper; storage internals stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Storage(_) => "Something went wrong, please try again".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<sqlx::Error> for StorefrontError {
    fn from(error: sqlx::Error) -> Self {
        match error.as_database_error().map(|e| e.kind()) {
            Some(sqlx::error::ErrorKind::UniqueViolation) => Self::Conflict("A record with this key".into()),
            Some(sqlx::error::ErrorKind::CheckViolation) => Self::Validation("Value violates a storage constraint".into()),
            _ => Self::Storage(error),
        }
    }
}

impl From<OrderError> for StorefrontError {
    fn from(error: OrderError) -> Self {
        match error {
            OrderError::EmptyCart => Self::EmptyCart,
            OrderError::MissingAddress => Self::MissingAddress,
            OrderError::MissingPaymentMethod => Self::MissingPaymentMethod,
            OrderError::AlreadyPaid => Self::AlreadyPaid,
            OrderError::NotPaid => Self::OrderNotPaid,
            OrderError::AlreadyDelivered => Self::AlreadyDelivered,
            OrderError::PaymentNotCompleted(status) => Self::PaymentNotCompleted(status),
            OrderError::CaptureMismatch(id) => Self::PaymentMismatch(id),
            OrderError::WrongPaymentMethod(method) => Self::WrongPaymentMethod(method),
            OrderError::Pricing(e) => Self::Validation(e.to_string()),
        }
    }
}

impl From<CartError> for StorefrontError {
    fn from(error: CartError) -> Self {
        match error {
            CartError::ItemNotFound => Self::CartItemNotFound,
            CartError::InvalidQuantity | CartError::Currency(_) => Self::Validation(error.to_string()),
        }
    }
}

impl From<ProductError> for StorefrontError {
    fn from(error: ProductError) -> Self {
        match error {
            ProductError::InsufficientStock { available, requested } => Self::InsufficientStock { available, requested },
            ProductError::Invalid(message) => Self::Validation(message),
            ProductError::Slug(e) => Self::Validation(e.to_string()),
        }
    }
}

impl From<SlugError> for StorefrontError {
    fn from(error: SlugError) -> Self { Self::Validation(error.to_string()) }
}

impl From<ValidationErrors> for StorefrontError {
    fn from(errors: ValidationErrors) -> Self { Self::Validation(validation_message(&errors)) }
}

pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Flattens field errors into one line, ordered by field name.
pub(crate) fn validation_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by_key(|(field, _)| *field);
    fields
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{field} is invalid"),
            })
        })
        .collect::<Vec<_>>()
        .join("; ")
}
