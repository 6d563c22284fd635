//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::domain::value_objects::{Money, Quantity, Slug, SlugError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub(crate) id: Uuid,
    pub(crate) slug: Slug,
    pub(crate) name: String,
    pub(crate) category: String,
    pub(crate) brand: String,
    pub(crate) description: String,
    pub(crate) price: Money,
    pub(crate) stock: Quantity,
    pub(crate) images: Vec<String>,
    pub(crate) is_featured: bool,
    pub(crate) banner: Option<String>,
    pub(crate) rating: Decimal,
    pub(crate) num_reviews: u32,
    pub(crate) created_at: DateTime<Utc>,
}

/// Admin-submitted product fields, used for both create and update.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct ProductInput {
    #[validate(length(min = 3, message = "Name must be at least 3 characters"))]
    pub name: String,
    #[validate(length(min = 3, message = "Slug must be at least 3 characters"))]
    pub slug: String,
    #[validate(length(min = 3, message = "Category must be at least 3 characters"))]
    pub category: String,
    #[validate(length(min = 3, message = "Brand must be at least 3 characters"))]
    pub brand: String,
    #[validate(length(min = 3, message = "Description must be at least 3 characters"))]
    pub description: String,
    #[validate(custom = "non_negative_price")]
    pub price: Decimal,
    pub stock: u32,
    #[validate(length(min = 1, message = "Product must have at least one image"))]
    pub images: Vec<String>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub banner: Option<String>,
}

fn non_negative_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() && !price.is_zero() {
        let mut err = ValidationError::new("price");
        err.message = Some("Price must not be negative".into());
        return Err(err);
    }
    if price.scale() > 2 && price.round_dp(2) != *price {
        let mut err = ValidationError::new("price");
        err.message = Some("Price must have at most two decimal places".into());
        return Err(err);
    }
    Ok(())
}

impl Product {
    pub fn create(input: ProductInput, currency: &str) -> Result<Self, ProductError> {
        input.validate()?;
        let slug = Slug::new(&input.slug)?;
        Ok(Self {
            id: Uuid::now_v7(), slug, name: input.name, category: input.category, brand: input.brand,
            description: input.description, price: Money::new(input.price, currency), stock: Quantity::new(input.stock),
            images: input.images, is_featured: input.is_featured, banner: input.banner,
            rating: Decimal::ZERO, num_reviews: 0, created_at: Utc::now(),
        })
    }

    /// Replaces the editable fields. Orders already placed keep their own price snapshot.
    pub fn update(&mut self, input: ProductInput) -> Result<(), ProductError> {
        input.validate()?;
        self.slug = Slug::new(&input.slug)?;
        self.name = input.name;
        self.category = input.category;
        self.brand = input.brand;
        self.description = input.description;
        self.price = Money::new(input.price, self.price.currency());
        self.stock = Quantity::new(input.stock);
        self.images = input.images;
        self.is_featured = input.is_featured;
        self.banner = input.banner;
        Ok(())
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn slug(&self) -> &Slug { &self.slug }
    pub fn name(&self) -> &str { &self.name }
    pub fn category(&self) -> &str { &self.category }
    pub fn price(&self) -> &Money { &self.price }
    pub fn stock(&self) -> Quantity { self.stock }
    pub fn images(&self) -> &[String] { &self.images }
    pub fn primary_image(&self) -> &str { self.images.first().map(String::as_str).unwrap_or_default() }
    pub fn is_featured(&self) -> bool { self.is_featured }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn is_in_stock(&self) -> bool { !self.stock.is_zero() }

    pub fn ensure_available(&self, qty: u32) -> Result<(), ProductError> {
        if self.stock.value() < qty {
            return Err(ProductError::InsufficientStock { available: self.stock.value(), requested: qty });
        }
        Ok(())
    }

    /// Stock never drops below zero here; overselling is reconciled by staff.
    pub fn release_stock(&mut self, qty: u32) { self.stock = self.stock.saturating_subtract(qty); }
}

#[derive(Debug, Clone, Error)]
pub enum ProductError {
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error("Not enough stock: {available} available, {requested} requested")]
    InsufficientStock { available: u32, requested: u32 },
}

impl From<ValidationErrors> for ProductError {
    fn from(errors: ValidationErrors) -> Self { Self::Invalid(crate::validation_message(&errors)) }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn input(slug: &str, price: Decimal, stock: u32) -> ProductInput {
        ProductInput {
            name: format!("Product {slug}"), slug: slug.to_string(), category: "Shirts".into(), brand: "Polo".into(),
            description: "A fine shirt".into(), price, stock, images: vec!["/images/p1.jpg".into()],
            is_featured: false, banner: None,
        }
    }

    #[test]
    fn test_product_create() {
        let p = Product::create(input("polo-shirt", Decimal::new(1999, 2), 5), "USD").unwrap();
        assert_eq!(p.slug().as_str(), "polo-shirt");
        assert_eq!(p.price().amount(), Decimal::new(1999, 2));
        assert!(p.is_in_stock());
    }

    #[test]
    fn test_product_rejects_negative_price_and_bad_slug() {
        assert!(matches!(Product::create(input("polo", Decimal::new(-1, 0), 1), "USD"), Err(ProductError::Invalid(_))));
        assert!(matches!(Product::create(input("polo shirt", Decimal::ONE, 1), "USD"), Err(ProductError::Slug(_))));
    }

    #[test]
    fn test_inventory() {
        let mut p = Product::create(input("polo", Decimal::ONE, 3), "USD").unwrap();
        assert!(p.ensure_available(3).is_ok());
        assert!(matches!(p.ensure_available(4), Err(ProductError::InsufficientStock { available: 3, requested: 4 })));
        p.release_stock(5);
        assert_eq!(p.stock().value(), 0);
    }
}
