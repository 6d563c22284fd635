//! Order Aggregate
//!
//! An order is placed once from a cart and afterwards only moves forward:
//! `Unpaid -> Paid` on the payment side and `Pending -> Delivered` on the fulfillment side,
//! where delivery requires payment. Line items and prices are a snapshot taken at placement.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::cart::{Cart, CartItem};
use crate::domain::events::StockLine;
use crate::domain::pricing::{PriceBreakdown, PricingPolicy};
use crate::domain::value_objects::{Money, MoneyError, PaymentMethod, ShippingAddress, Slug};

/// Status a provider reports for a fully captured payment.
pub const CAPTURE_COMPLETED: &str = "COMPLETED";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub(crate) id: Uuid,
    pub(crate) user_id: Uuid,
    pub(crate) shipping_address: ShippingAddress,
    pub(crate) items: Vec<OrderItem>,
    pub(crate) prices: PriceBreakdown,
    pub(crate) payment_method: PaymentMethod,
    pub(crate) payment: PaymentStatus,
    pub(crate) payment_result: Option<PaymentResult>,
    pub(crate) delivery: DeliveryStatus,
    pub(crate) created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderItem { pub product_id: Uuid, pub slug: Slug, pub name: String, pub image: String, pub price: Money, pub qty: u32 }

impl From<&CartItem> for OrderItem {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id, slug: item.slug.clone(), name: item.name.clone(),
            image: item.image.clone(), price: item.price.clone(), qty: item.qty,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PaymentStatus { Unpaid, Paid { paid_at: DateTime<Utc> } }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryStatus { Pending, Delivered { delivered_at: DateTime<Utc> } }

/// What the payment provider told us about the payment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResult { pub id: String, pub status: String, pub email_address: String, pub price_paid: Decimal }

impl PaymentResult {
    /// Placeholder recorded when a provider order is opened, before capture.
    pub fn pending(provider_order_id: impl Into<String>) -> Self {
        Self { id: provider_order_id.into(), status: String::new(), email_address: String::new(), price_paid: Decimal::ZERO }
    }
}

impl Order {
    /// Builds an unpaid order from a cart snapshot.
    pub fn place(
        user_id: Uuid,
        cart: &Cart,
        shipping_address: Option<&ShippingAddress>,
        payment_method: Option<PaymentMethod>,
        policy: &PricingPolicy,
    ) -> Result<Self, OrderError> {
        if cart.is_empty() { return Err(OrderError::EmptyCart); }
        let shipping_address = shipping_address.ok_or(OrderError::MissingAddress)?;
        let payment_method = payment_method.ok_or(OrderError::MissingPaymentMethod)?;
        let items: Vec<OrderItem> = cart.items().iter().map(OrderItem::from).collect();
        let line_totals: Vec<Money> = items.iter().map(|i| i.price.multiply(i.qty)).collect();
        let prices = policy.breakdown(Money::sum(cart.currency(), &line_totals)?)?;
        Ok(Self {
            id: Uuid::now_v7(), user_id, shipping_address: shipping_address.clone(), items, prices, payment_method,
            payment: PaymentStatus::Unpaid, payment_result: None, delivery: DeliveryStatus::Pending, created_at: Utc::now(),
        })
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn user_id(&self) -> Uuid { self.user_id }
    pub fn shipping_address(&self) -> &ShippingAddress { &self.shipping_address }
    pub fn items(&self) -> &[OrderItem] { &self.items }
    pub fn prices(&self) -> &PriceBreakdown { &self.prices }
    pub fn total(&self) -> &Money { &self.prices.total_price }
    pub fn payment_method(&self) -> PaymentMethod { self.payment_method }
    pub fn payment_result(&self) -> Option<&PaymentResult> { self.payment_result.as_ref() }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    pub fn is_paid(&self) -> bool { matches!(self.payment, PaymentStatus::Paid { .. }) }
    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        match self.payment { PaymentStatus::Paid { paid_at } => Some(paid_at), PaymentStatus::Unpaid => None }
    }
    pub fn is_delivered(&self) -> bool { matches!(self.delivery, DeliveryStatus::Delivered { .. }) }
    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        match self.delivery { DeliveryStatus::Delivered { delivered_at } => Some(delivered_at), DeliveryStatus::Pending => None }
    }

    pub fn stock_lines(&self) -> Vec<StockLine> {
        self.items.iter().map(|i| StockLine { product_id: i.product_id, qty: i.qty }).collect()
    }

    /// Remembers the provider order opened for this order so the capture can be matched later.
    pub fn record_provider_order(&mut self, provider_order_id: &str) -> Result<(), OrderError> {
        if self.is_paid() { return Err(OrderError::AlreadyPaid); }
        self.payment_result = Some(PaymentResult::pending(provider_order_id));
        Ok(())
    }

    /// True when the line items are exactly the ones in `cart`.
    pub fn was_placed_from(&self, cart: &Cart) -> bool {
        self.user_id == cart.user_id()
            && self.items.len() == cart.items().len()
            && self.items.iter().zip(cart.items()).all(|(line, item)| *line == OrderItem::from(item))
    }

    pub fn ensure_payment_method(&self, method: PaymentMethod) -> Result<(), OrderError> {
        if self.payment_method != method { return Err(OrderError::WrongPaymentMethod(self.payment_method)); }
        Ok(())
    }

    /// Only the provider order opened for this order may be captured.
    pub fn ensure_provider_order(&self, provider_order_id: &str) -> Result<(), OrderError> {
        if self.is_paid() { return Err(OrderError::AlreadyPaid); }
        match &self.payment_result {
            Some(recorded) if recorded.id == provider_order_id => Ok(()),
            _ => Err(OrderError::CaptureMismatch(provider_order_id.to_string())),
        }
    }

    /// Checks a provider capture against this order before it may be marked paid.
    pub fn verify_capture(&self, captured_id: &str, status: &str) -> Result<(), OrderError> {
        if self.is_paid() { return Err(OrderError::AlreadyPaid); }
        if status != CAPTURE_COMPLETED { return Err(OrderError::PaymentNotCompleted(status.to_string())); }
        self.ensure_provider_order(captured_id)
    }

    pub fn mark_paid(&mut self, paid_at: DateTime<Utc>, result: Option<PaymentResult>) -> Result<(), OrderError> {
        if self.is_paid() { return Err(OrderError::AlreadyPaid); }
        self.payment = PaymentStatus::Paid { paid_at };
        if result.is_some() { self.payment_result = result; }
        Ok(())
    }

    pub fn mark_delivered(&mut self, delivered_at: DateTime<Utc>) -> Result<(), OrderError> {
        if !self.is_paid() { return Err(OrderError::NotPaid); }
        if self.is_delivered() { return Err(OrderError::AlreadyDelivered); }
        self.delivery = DeliveryStatus::Delivered { delivered_at };
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("Your cart is empty")]
    EmptyCart,
    #[error("No shipping address")]
    MissingAddress,
    #[error("No payment method")]
    MissingPaymentMethod,
    #[error("Order is already paid")]
    AlreadyPaid,
    #[error("Order is not paid")]
    NotPaid,
    #[error("Order is already delivered")]
    AlreadyDelivered,
    #[error("Payment not completed (status {0:?})")]
    PaymentNotCompleted(String),
    #[error("Captured payment {0} does not belong to this order")]
    CaptureMismatch(String),
    #[error("Order is to be paid by {0}")]
    WrongPaymentMethod(PaymentMethod),
    #[error(transparent)]
    Pricing(#[from] MoneyError),
}
