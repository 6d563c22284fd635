//! Delivery tracking.

use chrono::Utc;
use uuid::Uuid;

use crate::domain::aggregates::Order;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::notify::Notifiers;
use crate::policy::{require_admin, Actor};
use crate::store::{OrderStore, SharedStore};
use crate::Result;

#[derive(Clone)]
pub struct FulfillmentService {
    store: SharedStore,
    notifiers: Notifiers,
}

impl FulfillmentService {
    pub fn new(store: SharedStore, notifiers: Notifiers) -> Self { Self { store, notifiers } }

    /// Marks a paid order delivered. Admin only.
    pub async fn mark_delivered(&self, order_id: Uuid, actor: &Actor) -> Result<Order> {
        require_admin(actor)?;
        let order = self.store.mark_order_delivered(order_id, Utc::now()).await?;
        let delivered_at = order.delivered_at().unwrap_or_else(Utc::now);
        tracing::info!(%order_id, %delivered_at, "order delivered");
        self.notifiers.dispatch(DomainEvent::Order(OrderEvent::Delivered { order_id, delivered_at })).await;
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::PaymentMethod;
    use crate::store::MemoryStore;
    use crate::test_support::{checked_out, user_cart};
    use crate::StorefrontError;
    use std::sync::Arc;

    async fn setup() -> (FulfillmentService, SharedStore, Uuid) {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let order = checked_out(&store, &user_cart(Uuid::now_v7()), PaymentMethod::CashOnDelivery).await;
        (FulfillmentService::new(Arc::clone(&store), Notifiers::new()), store, order.id())
    }

    #[tokio::test]
    async fn unpaid_orders_cannot_be_delivered() {
        let (service, store, id) = setup().await;
        let err = service.mark_delivered(id, &Actor::admin(Uuid::now_v7())).await.unwrap_err();
        assert!(matches!(err, StorefrontError::OrderNotPaid));
        assert!(!store.order_by_id(id).await.unwrap().unwrap().is_delivered());
    }

    #[tokio::test]
    async fn paid_orders_are_delivered_once() {
        let (service, store, id) = setup().await;
        let admin = Actor::admin(Uuid::now_v7());
        store.mark_order_paid(id, Utc::now(), None).await.unwrap();

        let delivered = service.mark_delivered(id, &admin).await.unwrap();
        assert!(delivered.is_paid() && delivered.is_delivered());
        assert!(delivered.delivered_at() >= delivered.paid_at());

        let err = service.mark_delivered(id, &admin).await.unwrap_err();
        assert!(matches!(err, StorefrontError::AlreadyDelivered));
    }

    #[tokio::test]
    async fn delivery_is_admin_only() {
        let (service, store, id) = setup().await;
        store.mark_order_paid(id, Utc::now(), None).await.unwrap();
        let err = service.mark_delivered(id, &Actor::user(Uuid::now_v7())).await.unwrap_err();
        assert!(matches!(err, StorefrontError::Unauthorized));
        let err = service.mark_delivered(Uuid::now_v7(), &Actor::admin(Uuid::now_v7())).await.unwrap_err();
        assert!(matches!(err, StorefrontError::OrderNotFound));
    }
}
