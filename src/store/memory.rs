//! In-process store backed by a single lock.
//!
//! Used by tests and when the service runs without `DATABASE_URL`. Every operation takes the write
//! lock once, validates, then mutates, so multi-record changes are all-or-nothing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::cmp::Reverse;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, Order, PaymentResult, Product, User};
use crate::store::{CartStore, OrderStore, ProductFilter, ProductStore, UserStore};
use crate::{Result, StorefrontError};

#[derive(Debug, Default)]
struct State {
    products: HashMap<Uuid, Product>,
    carts: HashMap<Uuid, Cart>,
    orders: HashMap<Uuid, Order>,
    users: HashMap<Uuid, User>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

fn window<T: Clone>(mut rows: Vec<&T>, key: impl Fn(&T) -> (DateTime<Utc>, Uuid), offset: u64, limit: u32) -> (Vec<T>, u64) {
    rows.sort_by_key(|row| Reverse(key(row)));
    let total = rows.len() as u64;
    let offset = usize::try_from(offset).unwrap_or(usize::MAX);
    let items = rows.into_iter().skip(offset).take(limit as usize).cloned().collect();
    (items, total)
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn insert_product(&self, product: &Product) -> Result<()> {
        let mut state = self.state.write();
        if state.products.values().any(|p| p.slug == product.slug) {
            return Err(StorefrontError::Conflict(format!("Product with slug {}", product.slug)));
        }
        state.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> Result<()> {
        let mut state = self.state.write();
        if state.products.values().any(|p| p.slug == product.slug && p.id != product.id) {
            return Err(StorefrontError::Conflict(format!("Product with slug {}", product.slug)));
        }
        let slot = state.products.get_mut(&product.id).ok_or(StorefrontError::ProductNotFound)?;
        *slot = product.clone();
        Ok(())
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool> {
        Ok(self.state.write().products.remove(&id).is_some())
    }

    async fn product_by_id(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.state.read().products.get(&id).cloned())
    }

    async fn product_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        Ok(self.state.read().products.values().find(|p| p.slug.as_str() == slug).cloned())
    }

    async fn latest_products(&self, limit: u32) -> Result<Vec<Product>> {
        let state = self.state.read();
        let (items, _) = window(state.products.values().collect(), |p| (p.created_at, p.id), 0, limit);
        Ok(items)
    }

    async fn list_products(&self, filter: &ProductFilter, offset: u64, limit: u32) -> Result<(Vec<Product>, u64)> {
        let state = self.state.read();
        let rows = state.products.values().filter(|p| filter.matches(p)).collect();
        Ok(window(rows, |p| (p.created_at, p.id), offset, limit))
    }

    async fn release_stock(&self, id: Uuid, qty: u32) -> Result<()> {
        let mut state = self.state.write();
        let product = state.products.get_mut(&id).ok_or(StorefrontError::ProductNotFound)?;
        product.release_stock(qty);
        Ok(())
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn cart_for_user(&self, user_id: Uuid) -> Result<Option<Cart>> {
        Ok(self.state.read().carts.get(&user_id).cloned())
    }

    async fn save_cart(&self, cart: &Cart) -> Result<()> {
        self.state.write().carts.insert(cart.user_id, cart.clone());
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create_order_from_cart(&self, order: &Order, cart: &Cart) -> Result<()> {
        let mut state = self.state.write();
        if state.orders.contains_key(&order.id) {
            return Err(StorefrontError::Conflict(format!("Order {}", order.id)));
        }
        let stored = state.carts.get_mut(&order.user_id).ok_or(StorefrontError::EmptyCart)?;
        if stored.is_empty() {
            return Err(StorefrontError::EmptyCart);
        }
        if stored.items() != cart.items() || !order.was_placed_from(stored) {
            return Err(StorefrontError::CartChanged);
        }
        stored.clear();
        state.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn order_by_id(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.state.read().orders.get(&id).cloned())
    }

    async fn record_provider_order(&self, id: Uuid, provider_order_id: &str) -> Result<Order> {
        let mut state = self.state.write();
        let order = state.orders.get_mut(&id).ok_or(StorefrontError::OrderNotFound)?;
        order.record_provider_order(provider_order_id)?;
        Ok(order.clone())
    }

    async fn mark_order_paid(&self, id: Uuid, paid_at: DateTime<Utc>, result: Option<&PaymentResult>) -> Result<Order> {
        let mut state = self.state.write();
        let order = state.orders.get_mut(&id).ok_or(StorefrontError::OrderNotFound)?;
        order.mark_paid(paid_at, result.cloned())?;
        Ok(order.clone())
    }

    async fn mark_order_delivered(&self, id: Uuid, delivered_at: DateTime<Utc>) -> Result<Order> {
        let mut state = self.state.write();
        let order = state.orders.get_mut(&id).ok_or(StorefrontError::OrderNotFound)?;
        order.mark_delivered(delivered_at)?;
        Ok(order.clone())
    }

    async fn list_orders(&self, user_id: Option<Uuid>, offset: u64, limit: u32) -> Result<(Vec<Order>, u64)> {
        let state = self.state.read();
        let rows = state.orders.values().filter(|o| user_id.map_or(true, |u| o.user_id == u)).collect();
        Ok(window(rows, |o| (o.created_at, o.id), offset, limit))
    }

    async fn delete_order(&self, id: Uuid) -> Result<bool> {
        Ok(self.state.write().orders.remove(&id).is_some())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut state = self.state.write();
        if state.users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(StorefrontError::Conflict(format!("User with email {}", user.email)));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.state.read().users.get(&id).cloned())
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let mut state = self.state.write();
        let slot = state.users.get_mut(&user.id).ok_or(StorefrontError::UserNotFound)?;
        *slot = user.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{placed_order, product, user_cart};
    use rust_decimal::Decimal;
    use std::sync::Arc;

    #[tokio::test]
    async fn order_creation_is_all_or_nothing() {
        let store = MemoryStore::new();
        let cart = user_cart(Uuid::now_v7());
        store.save_cart(&cart).await.unwrap();
        let order = placed_order(&cart);

        store.create_order_from_cart(&order, &cart).await.unwrap();
        assert!(store.cart_for_user(cart.user_id).await.unwrap().unwrap().is_empty());

        // Refill the cart, then fail the insert on a duplicate id.
        store.save_cart(&cart).await.unwrap();
        let err = store.create_order_from_cart(&order, &cart).await.unwrap_err();
        assert!(matches!(err, StorefrontError::Conflict(_)));
        assert_eq!(store.cart_for_user(cart.user_id).await.unwrap().unwrap().item_count(), 2);
        assert_eq!(store.list_orders(None, 0, 10).await.unwrap().1, 1);
    }

    #[tokio::test]
    async fn one_cart_snapshot_yields_one_order() {
        let store = MemoryStore::new();
        let cart = user_cart(Uuid::now_v7());
        store.save_cart(&cart).await.unwrap();

        let first = placed_order(&cart);
        let second = placed_order(&cart);
        store.create_order_from_cart(&first, &cart).await.unwrap();
        let err = store.create_order_from_cart(&second, &cart).await.unwrap_err();
        assert!(matches!(err, StorefrontError::EmptyCart));
        assert_eq!(store.list_orders(Some(cart.user_id), 0, 10).await.unwrap().1, 1);
    }

    #[tokio::test]
    async fn items_added_after_pricing_are_not_lost() {
        let store = MemoryStore::new();
        let priced = user_cart(Uuid::now_v7());
        store.save_cart(&priced).await.unwrap();
        let order = placed_order(&priced);

        let mut grown = priced.clone();
        grown.add_item(crate::domain::aggregates::CartItem::snapshot(&product("scarf", Decimal::ONE, 3), 1)).unwrap();
        store.save_cart(&grown).await.unwrap();

        let err = store.create_order_from_cart(&order, &priced).await.unwrap_err();
        assert!(matches!(err, StorefrontError::CartChanged));
        assert_eq!(store.cart_for_user(priced.user_id).await.unwrap().unwrap().item_count(), 3);
        assert_eq!(store.list_orders(None, 0, 10).await.unwrap().1, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_payments_have_one_winner() {
        let store = Arc::new(MemoryStore::new());
        let cart = user_cart(Uuid::now_v7());
        store.save_cart(&cart).await.unwrap();
        let order = placed_order(&cart);
        store.create_order_from_cart(&order, &cart).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            let id = order.id;
            handles.push(tokio::spawn(async move { store.mark_order_paid(id, Utc::now(), None).await }));
        }
        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(e) => assert!(matches!(e, StorefrontError::AlreadyPaid)),
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn products_list_newest_first_with_filter() {
        let store = MemoryStore::new();
        for slug in ["red-shirt", "blue-shirt", "green-hat"] {
            store.insert_product(&product(slug, Decimal::TEN, 1)).await.unwrap();
        }
        let latest = store.latest_products(2).await.unwrap();
        assert_eq!(latest.iter().map(|p| p.slug.as_str()).collect::<Vec<_>>(), vec!["green-hat", "blue-shirt"]);

        let filter = ProductFilter { query: Some("SHIRT".into()), category: None };
        let (items, total) = store.list_products(&filter, 1, 5).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].slug.as_str(), "red-shirt");
    }

    #[tokio::test]
    async fn duplicate_slug_is_a_conflict() {
        let store = MemoryStore::new();
        store.insert_product(&product("polo", Decimal::ONE, 1)).await.unwrap();
        let err = store.insert_product(&product("polo", Decimal::ONE, 1)).await.unwrap_err();
        assert!(matches!(err, StorefrontError::Conflict(_)));
    }
}
