//! Order reads, listings and admin deletion.

use std::sync::Arc;
use uuid::Uuid;

use crate::config::ShopSettings;
use crate::domain::aggregates::Order;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::notify::Notifiers;
use crate::pagination::{Page, PageRequest};
use crate::policy::{require_admin, require_owner_or_admin, Actor};
use crate::store::{OrderStore, SharedStore};
use crate::{Result, StorefrontError};

#[derive(Clone)]
pub struct OrderService {
    store: SharedStore,
    notifiers: Notifiers,
    settings: Arc<ShopSettings>,
}

impl OrderService {
    pub fn new(store: SharedStore, notifiers: Notifiers, settings: Arc<ShopSettings>) -> Self {
        Self { store, notifiers, settings }
    }

    pub async fn order(&self, order_id: Uuid, actor: &Actor) -> Result<Order> {
        let order = self.store.order_by_id(order_id).await?.ok_or(StorefrontError::OrderNotFound)?;
        require_owner_or_admin(actor, order.user_id())?;
        Ok(order)
    }

    /// The actor's own orders, newest first.
    pub async fn my_orders(&self, actor: &Actor, page: u32) -> Result<Page<Order>> {
        self.page(Some(actor.user_id), PageRequest::new(page, self.settings.page_size)?).await
    }

    /// Every order, newest first. Admin only.
    pub async fn list_orders(&self, actor: &Actor, request: PageRequest) -> Result<Page<Order>> {
        require_admin(actor)?;
        self.page(None, request).await
    }

    pub async fn list_orders_page(&self, actor: &Actor, page: u32) -> Result<Page<Order>> {
        self.list_orders(actor, PageRequest::new(page, self.settings.page_size)?).await
    }

    pub async fn delete_order(&self, order_id: Uuid, actor: &Actor) -> Result<()> {
        require_admin(actor)?;
        if !self.store.delete_order(order_id).await? {
            return Err(StorefrontError::OrderNotFound);
        }
        tracing::info!(%order_id, "order deleted");
        self.notifiers.dispatch(DomainEvent::Order(OrderEvent::Deleted { order_id })).await;
        Ok(())
    }

    async fn page(&self, user_id: Option<Uuid>, request: PageRequest) -> Result<Page<Order>> {
        let (items, total) = self.store.list_orders(user_id, request.offset(), request.limit()).await?;
        Ok(Page::from_window(request, items, total))
    }
}
