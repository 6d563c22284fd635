//! Checkout price breakdown.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Money, MoneyError};

/// Tax and shipping rules applied to an items subtotal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PricingPolicy {
    pub tax_rate: Decimal,
    pub shipping_price: Decimal,
    /// Orders whose items price is strictly above this ship for free.
    pub free_shipping_threshold: Option<Decimal>,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(15, 2),
            shipping_price: Decimal::new(10, 0),
            free_shipping_threshold: Some(Decimal::new(100, 0)),
        }
    }
}

impl PricingPolicy {
    pub fn flat(tax_rate: Decimal, shipping_price: Decimal) -> Self {
        Self { tax_rate, shipping_price, free_shipping_threshold: None }
    }

    pub fn shipping_for(&self, items_price: &Money) -> Money {
        match self.free_shipping_threshold {
            Some(threshold) if items_price.amount() > threshold => Money::zero(items_price.currency()),
            _ => Money::new(self.shipping_price, items_price.currency()),
        }
    }

    pub fn tax_for(&self, items_price: &Money) -> Money { items_price.scale(self.tax_rate).round() }

    pub fn breakdown(&self, items_price: Money) -> Result<PriceBreakdown, MoneyError> {
        let items_price = items_price.round();
        let tax_price = self.tax_for(&items_price);
        let shipping_price = self.shipping_for(&items_price).round();
        let total_price = items_price.add(&tax_price)?.add(&shipping_price)?;
        Ok(PriceBreakdown { items_price, tax_price, shipping_price, total_price })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub items_price: Money,
    pub tax_price: Money,
    pub shipping_price: Money,
    pub total_price: Money,
}

impl PriceBreakdown {
    pub fn is_consistent(&self) -> bool {
        self.items_price.amount() + self.tax_price.amount() + self.shipping_price.amount() == self.total_price.amount()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_policy_breakdown() {
        let policy = PricingPolicy::flat(Decimal::new(10, 2), Decimal::new(500, 2));
        let prices = policy.breakdown(Money::usd(Decimal::new(2500, 2))).unwrap();
        assert_eq!(prices.tax_price.amount(), Decimal::new(250, 2));
        assert_eq!(prices.shipping_price.amount(), Decimal::new(5, 0));
        assert_eq!(prices.total_price.amount(), Decimal::new(3250, 2));
        assert!(prices.is_consistent());
    }

    #[test]
    fn default_policy_ships_free_above_threshold() {
        let policy = PricingPolicy::default();
        let at_threshold = policy.breakdown(Money::usd(Decimal::new(100, 0))).unwrap();
        assert_eq!(at_threshold.shipping_price.amount(), Decimal::new(10, 0));
        let above = policy.breakdown(Money::usd(Decimal::new(10001, 2))).unwrap();
        assert!(above.shipping_price.amount().is_zero());
        assert_eq!(above.tax_price.amount(), Decimal::new(1500, 2));
    }
}
