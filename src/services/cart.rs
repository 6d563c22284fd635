//! Per-user cart.

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::ShopSettings;
use crate::domain::aggregates::{Cart, CartItem};
use crate::domain::pricing::PriceBreakdown;
use crate::policy::Actor;
use crate::store::{CartStore, ProductStore, SharedStore};
use crate::{Result, StorefrontError};

/// A cart together with the prices checkout would charge for it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CartView {
    #[serde(flatten)]
    pub cart: Cart,
    pub prices: PriceBreakdown,
}

#[derive(Clone)]
pub struct CartService {
    store: SharedStore,
    settings: Arc<ShopSettings>,
}

impl CartService {
    pub fn new(store: SharedStore, settings: Arc<ShopSettings>) -> Self { Self { store, settings } }

    async fn load(&self, user_id: Uuid) -> Result<Cart> {
        Ok(self
            .store
            .cart_for_user(user_id)
            .await?
            .unwrap_or_else(|| Cart::for_user(user_id, &self.settings.currency)))
    }

    fn view(&self, cart: Cart) -> Result<CartView> {
        let prices = cart.prices(&self.settings.pricing).map_err(|e| StorefrontError::Validation(e.to_string()))?;
        Ok(CartView { cart, prices })
    }

    pub async fn cart(&self, actor: &Actor) -> Result<CartView> { self.view(self.load(actor.user_id).await?) }

    /// Adds `qty` units, refusing to put more in the cart than is in stock.
    pub async fn add_item(&self, actor: &Actor, product_id: Uuid, qty: u32) -> Result<CartView> {
        let product = self.store.product_by_id(product_id).await?.ok_or(StorefrontError::ProductNotFound)?;
        let mut cart = self.load(actor.user_id).await?;
        product.ensure_available(cart.quantity_of(product_id).saturating_add(qty))?;
        cart.add_item(CartItem::snapshot(&product, qty))?;
        self.store.save_cart(&cart).await?;
        tracing::debug!(user_id = %actor.user_id, %product_id, qty, "cart item added");
        self.view(cart)
    }

    /// Takes one unit out; the line disappears when its quantity reaches zero.
    pub async fn remove_item(&self, actor: &Actor, product_id: Uuid) -> Result<CartView> {
        let mut cart = self.store.cart_for_user(actor.user_id).await?.ok_or(StorefrontError::CartItemNotFound)?;
        cart.remove_one(product_id)?;
        self.store.save_cart(&cart).await?;
        tracing::debug!(user_id = %actor.user_id, %product_id, "cart item removed");
        self.view(cart)
    }
}
