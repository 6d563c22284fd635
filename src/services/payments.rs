//! Moving orders from unpaid to paid.
//!
//! Two routes lead to `Paid`: a captured provider payment approved by the buyer, or an admin confirming
//! that cash was received on delivery. Either way the store performs the transition as one guarded
//! update, so concurrent confirmations produce a single winner and the loser sees `AlreadyPaid`.

use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::aggregates::{Order, PaymentResult};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::PaymentMethod;
use crate::notify::Notifiers;
use crate::payments::{PaymentProvider, ProviderOrder};
use crate::policy::{require_admin, require_owner_or_admin, Actor};
use crate::store::{OrderStore, SharedStore};
use crate::{Result, StorefrontError};

/// What the checkout page posts back once the buyer approves the provider order.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ApprovalPayload {
    #[serde(rename = "orderID")]
    pub order_id: String,
}

#[derive(Clone)]
pub struct PaymentService {
    store: SharedStore,
    provider: Arc<dyn PaymentProvider>,
    notifiers: Notifiers,
}

impl PaymentService {
    pub fn new(store: SharedStore, provider: Arc<dyn PaymentProvider>, notifiers: Notifiers) -> Self {
        Self { store, provider, notifiers }
    }

    async fn visible_order(&self, order_id: Uuid, actor: &Actor) -> Result<Order> {
        let order = self.store.order_by_id(order_id).await?.ok_or(StorefrontError::OrderNotFound)?;
        require_owner_or_admin(actor, order.user_id())?;
        Ok(order)
    }

    /// Opens a provider order for the order total and remembers its id for the later capture.
    pub async fn create_provider_order(&self, order_id: Uuid, actor: &Actor) -> Result<ProviderOrder> {
        let order = self.visible_order(order_id, actor).await?;
        if order.is_paid() {
            return Err(StorefrontError::AlreadyPaid);
        }
        order.ensure_payment_method(PaymentMethod::PayPal)?;
        let provider_order = self.provider.create_order(order.total()).await?;
        self.store.record_provider_order(order_id, &provider_order.id).await?;
        tracing::info!(%order_id, provider_order_id = %provider_order.id, "provider order opened");
        Ok(provider_order)
    }

    /// Captures the approved provider order and marks the order paid when the capture completed.
    pub async fn approve_provider_order(&self, order_id: Uuid, actor: &Actor, payload: ApprovalPayload) -> Result<Order> {
        let order = self.visible_order(order_id, actor).await?;
        if order.is_paid() {
            return Err(StorefrontError::AlreadyPaid);
        }
        order.ensure_payment_method(PaymentMethod::PayPal)?;
        if let Err(error) = order.ensure_provider_order(&payload.order_id) {
            tracing::warn!(%order_id, provider_order_id = %payload.order_id, "approval for a provider order this order did not open");
            return Err(error.into());
        }
        let capture = self.provider.capture_order(&payload.order_id).await?;
        if let Err(error) = order.verify_capture(&capture.id, &capture.status) {
            tracing::warn!(%order_id, capture_id = %capture.id, status = %capture.status, "capture rejected");
            return Err(error.into());
        }
        let result = PaymentResult {
            id: capture.id,
            status: capture.status,
            email_address: capture.email_address,
            price_paid: order.total().amount(),
        };
        self.settle(order_id, Some(result)).await
    }

    /// Records cash received on delivery. Admin only.
    pub async fn confirm_cash_payment(&self, order_id: Uuid, actor: &Actor) -> Result<Order> {
        require_admin(actor)?;
        let order = self.store.order_by_id(order_id).await?.ok_or(StorefrontError::OrderNotFound)?;
        order.ensure_payment_method(PaymentMethod::CashOnDelivery)?;
        self.settle(order_id, None).await
    }

    async fn settle(&self, order_id: Uuid, result: Option<PaymentResult>) -> Result<Order> {
        let order = self.store.mark_order_paid(order_id, Utc::now(), result.as_ref()).await?;
        let paid_at = order.paid_at().unwrap_or_else(Utc::now);
        tracing::info!(%order_id, method = %order.payment_method(), "order paid");
        self.notifiers
            .dispatch(DomainEvent::Order(OrderEvent::Paid {
                order_id,
                method: order.payment_method(),
                paid_at,
                lines: order.stock_lines(),
            }))
            .await;
        Ok(order)
    }
}
