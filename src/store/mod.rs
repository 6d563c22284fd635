//! Persistence seams.
//!
//! Every state transition on an order is a single guarded update: implementations must apply the
//! check and the write atomically so that concurrent callers see exactly one winner.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, Order, PaymentResult, Product, User};
use crate::Result;

pub type SharedStore = Arc<dyn Store>;

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ProductFilter {
    /// Case-insensitive substring of the product name.
    pub query: Option<String>,
    pub category: Option<String>,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        let query_ok = self.query.as_deref().map_or(true, |q| product.name().to_lowercase().contains(&q.to_lowercase()));
        let category_ok = self.category.as_deref().map_or(true, |c| product.category() == c);
        query_ok && category_ok
    }

    /// Drops blank criteria so `?query=` behaves like no filter.
    pub fn normalized(self) -> Self {
        let keep = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Self { query: keep(self.query), category: keep(self.category) }
    }
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Fails with `Conflict` when the slug is taken.
    async fn insert_product(&self, product: &Product) -> Result<()>;
    /// Fails with `ProductNotFound` when the id does not resolve.
    async fn update_product(&self, product: &Product) -> Result<()>;
    async fn delete_product(&self, id: Uuid) -> Result<bool>;
    async fn product_by_id(&self, id: Uuid) -> Result<Option<Product>>;
    async fn product_by_slug(&self, slug: &str) -> Result<Option<Product>>;
    /// Newest first.
    async fn latest_products(&self, limit: u32) -> Result<Vec<Product>>;
    /// Newest first; returns the window and the total number of matches.
    async fn list_products(&self, filter: &ProductFilter, offset: u64, limit: u32) -> Result<(Vec<Product>, u64)>;
    /// Lowers stock by `qty`, stopping at zero.
    async fn release_stock(&self, id: Uuid, qty: u32) -> Result<()>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    async fn cart_for_user(&self, user_id: Uuid) -> Result<Option<Cart>>;
    async fn save_cart(&self, cart: &Cart) -> Result<()>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts the order and empties the owner's cart as one unit: on error neither is changed.
    ///
    /// The stored cart must still hold the `cart` snapshot the order was priced from, otherwise
    /// this fails with `EmptyCart` (already ordered) or `CartChanged`.
    async fn create_order_from_cart(&self, order: &Order, cart: &Cart) -> Result<()>;
    async fn order_by_id(&self, id: Uuid) -> Result<Option<Order>>;
    /// Stores an opened provider order on an unpaid order.
    async fn record_provider_order(&self, id: Uuid, provider_order_id: &str) -> Result<Order>;
    /// `Unpaid -> Paid`; fails with `AlreadyPaid` if another caller got there first.
    async fn mark_order_paid(&self, id: Uuid, paid_at: DateTime<Utc>, result: Option<&PaymentResult>) -> Result<Order>;
    /// `Pending -> Delivered` on a paid order.
    async fn mark_order_delivered(&self, id: Uuid, delivered_at: DateTime<Utc>) -> Result<Order>;
    /// Newest first, optionally restricted to one user.
    async fn list_orders(&self, user_id: Option<Uuid>, offset: u64, limit: u32) -> Result<(Vec<Order>, u64)>;
    async fn delete_order(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> Result<()>;
    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>>;
    /// Fails with `UserNotFound` when the id does not resolve.
    async fn update_user(&self, user: &User) -> Result<()>;
}

pub trait Store: ProductStore + CartStore + OrderStore + UserStore {}

impl<T> Store for T where T: ProductStore + CartStore + OrderStore + UserStore {}
