//! Turning a cart into an order.

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::ShopSettings;
use crate::domain::aggregates::{Cart, Order};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{PaymentMethod, ShippingAddress};
use crate::notify::Notifiers;
use crate::policy::Actor;
use crate::store::{CartStore, OrderStore, SharedStore, UserStore};
use crate::{Result, StorefrontError};

/// A freshly stored order and the page the shopper should be sent to.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub redirect_to: String,
}

impl PlacedOrder {
    fn new(order: Order) -> Self {
        let redirect_to = format!("/order/{}", order.id());
        Self { order, redirect_to }
    }
}

#[derive(Clone)]
pub struct CheckoutService {
    store: SharedStore,
    notifiers: Notifiers,
    settings: Arc<ShopSettings>,
}

impl CheckoutService {
    pub fn new(store: SharedStore, notifiers: Notifiers, settings: Arc<ShopSettings>) -> Self {
        Self { store, notifiers, settings }
    }

    /// Places an order from the actor's cart and the address and payment method on their profile.
    pub async fn place_order(&self, actor: &Actor) -> Result<PlacedOrder> {
        let user = self.store.user_by_id(actor.user_id).await?.ok_or(StorefrontError::UserNotFound)?;
        let cart = self
            .store
            .cart_for_user(actor.user_id)
            .await?
            .unwrap_or_else(|| Cart::for_user(actor.user_id, &self.settings.currency));
        self.create_order(&cart, user.address(), user.payment_method(), actor.user_id).await
    }

    /// Prices the cart snapshot, stores the order unpaid and empties the cart in one step.
    pub async fn create_order(
        &self,
        cart: &Cart,
        shipping_address: Option<&ShippingAddress>,
        payment_method: Option<PaymentMethod>,
        user_id: Uuid,
    ) -> Result<PlacedOrder> {
        let order = Order::place(user_id, cart, shipping_address, payment_method, &self.settings.pricing)?;
        self.store.create_order_from_cart(&order, cart).await?;
        tracing::info!(order_id = %order.id(), %user_id, total = %order.total(), "order placed");
        self.notifiers
            .dispatch(DomainEvent::Order(OrderEvent::Placed {
                order_id: order.id(),
                user_id,
                total: order.total().amount(),
            }))
            .await;
        Ok(PlacedOrder::new(order))
    }
}
