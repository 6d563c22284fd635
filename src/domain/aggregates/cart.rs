//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::product::Product;
use crate::domain::pricing::{PriceBreakdown, PricingPolicy};
use crate::domain::value_objects::{Money, MoneyError, Slug};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub(crate) id: Uuid,
    pub(crate) user_id: Uuid,
    pub(crate) items: Vec<CartItem>,
    pub(crate) items_price: Money,
    pub(crate) currency: String,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

/// A product as it looked when it was put in the cart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: Uuid,
    pub slug: Slug,
    pub name: String,
    pub image: String,
    pub price: Money,
    pub qty: u32,
}

impl CartItem {
    pub fn snapshot(product: &Product, qty: u32) -> Self {
        Self {
            product_id: product.id(), slug: product.slug().clone(), name: product.name().to_string(),
            image: product.primary_image().to_string(), price: product.price().clone(), qty,
        }
    }

    pub fn line_total(&self) -> Money { self.price.multiply(self.qty) }
}

impl Cart {
    pub fn for_user(user_id: Uuid, currency: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), user_id, items: vec![], items_price: Money::zero(currency),
            currency: currency.to_uppercase(), created_at: now, updated_at: now,
        }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn user_id(&self) -> Uuid { self.user_id }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn items_price(&self) -> &Money { &self.items_price }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn quantity_of(&self, product_id: Uuid) -> u32 {
        self.items.iter().find(|i| i.product_id == product_id).map_or(0, |i| i.qty)
    }

    pub fn prices(&self, policy: &PricingPolicy) -> Result<PriceBreakdown, MoneyError> {
        policy.breakdown(self.items_price.clone())
    }

    /// Adds an item, merging quantities with an existing line for the same product.
    pub fn add_item(&mut self, item: CartItem) -> Result<(), CartError> {
        if item.qty == 0 { return Err(CartError::InvalidQuantity); }
        if item.price.currency() != self.currency {
            return Err(CartError::Currency(MoneyError::CurrencyMismatch {
                left: self.currency.clone(), right: item.price.currency().to_string(),
            }));
        }
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == item.product_id) {
            existing.qty = existing.qty.saturating_add(item.qty);
        } else {
            self.items.push(item);
        }
        self.recalculate()
    }

    /// Takes one unit of the product out of the cart, dropping the line when it reaches zero.
    pub fn remove_one(&mut self, product_id: Uuid) -> Result<(), CartError> {
        let pos = self.items.iter().position(|i| i.product_id == product_id).ok_or(CartError::ItemNotFound)?;
        if self.quantity_of(product_id) > 1 {
            if let Some(item) = self.items.get_mut(pos) { item.qty -= 1; }
        } else {
            self.items.remove(pos);
        }
        self.recalculate()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.items_price = Money::zero(&self.currency);
        self.updated_at = Utc::now();
    }

    pub(crate) fn recalculate(&mut self) -> Result<(), CartError> {
        let totals: Vec<Money> = self.items.iter().map(CartItem::line_total).collect();
        self.items_price = Money::sum(&self.currency, &totals)?;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum CartError {
    #[error("Item not found in cart")]
    ItemNotFound,
    #[error("Quantity must be at least 1")]
    InvalidQuantity,
    #[error(transparent)]
    Currency(#[from] MoneyError),
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rust_decimal::Decimal;

    pub(crate) fn item(slug: &str, price: Decimal, qty: u32) -> CartItem {
        CartItem {
            product_id: Uuid::from_u128(slug.bytes().fold(7u128, |acc, b| acc.wrapping_mul(31).wrapping_add(u128::from(b)))),
            slug: Slug::new(slug).unwrap(),
            name: slug.into(), image: format!("/images/{slug}.jpg"), price: Money::usd(price), qty,
        }
    }

    #[test]
    fn test_cart_operations() {
        let mut cart = Cart::for_user(Uuid::now_v7(), "USD");
        cart.add_item(item("widget", Decimal::new(10, 0), 2)).unwrap();
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.items_price().amount(), Decimal::new(20, 0));
        cart.add_item(item("widget", Decimal::new(10, 0), 1)).unwrap();
        assert_eq!(cart.items()[0].qty, 3); // Merged
        cart.add_item(item("gadget", Decimal::new(5, 0), 1)).unwrap();
        assert_eq!(cart.items_price().amount(), Decimal::new(35, 0));
    }

    #[test]
    fn test_remove_decrements_then_drops() {
        let mut cart = Cart::for_user(Uuid::now_v7(), "USD");
        let widget = item("widget", Decimal::new(10, 0), 2);
        let id = widget.product_id;
        cart.add_item(widget).unwrap();
        cart.remove_one(id).unwrap();
        assert_eq!(cart.quantity_of(id), 1);
        cart.remove_one(id).unwrap();
        assert!(cart.is_empty());
        assert!(cart.items_price().amount().is_zero());
        assert!(matches!(cart.remove_one(id), Err(CartError::ItemNotFound)));
    }

    #[test]
    fn test_rejects_zero_quantity_and_foreign_currency() {
        let mut cart = Cart::for_user(Uuid::now_v7(), "USD");
        assert!(matches!(cart.add_item(item("widget", Decimal::ONE, 0)), Err(CartError::InvalidQuantity)));
        let mut euro = item("widget", Decimal::ONE, 1);
        euro.price = Money::new(Decimal::ONE, "EUR");
        assert!(matches!(cart.add_item(euro), Err(CartError::Currency(_))));
    }
}
