//! Downstream reactions to domain events.
//!
//! Notifiers run after the state change is stored. A failing notifier is logged and skipped; it never
//! undoes the change that produced the event.

mod nats;

pub use nats::NatsNotifier;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::events::{DomainEvent, OrderEvent};
use crate::store::{ProductStore, SharedStore};

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("publish failed: {0}")]
    Publish(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn notify(&self, event: &DomainEvent) -> Result<(), NotifyError>;
}

/// Fan-out over every registered notifier.
#[derive(Clone, Default)]
pub struct Notifiers {
    inner: Vec<Arc<dyn Notifier>>,
}

impl Notifiers {
    pub fn new() -> Self { Self::default() }

    pub fn with(mut self, notifier: impl Notifier + 'static) -> Self {
        self.inner.push(Arc::new(notifier));
        self
    }

    pub fn len(&self) -> usize { self.inner.len() }

    pub fn is_empty(&self) -> bool { self.inner.is_empty() }

    pub async fn dispatch(&self, event: DomainEvent) {
        for notifier in &self.inner {
            if let Err(error) = notifier.notify(&event).await {
                tracing::warn!(notifier = notifier.name(), subject = %event.subject(), %error, "notifier failed");
            }
        }
    }
}

impl std::fmt::Debug for Notifiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.inner.iter().map(|n| n.name())).finish()
    }
}

/// Takes paid quantities out of product stock.
pub struct StockNotifier {
    store: SharedStore,
}

impl StockNotifier {
    pub fn new(store: SharedStore) -> Self { Self { store } }
}

#[async_trait]
impl Notifier for StockNotifier {
    fn name(&self) -> &'static str { "stock" }

    async fn notify(&self, event: &DomainEvent) -> Result<(), NotifyError> {
        let DomainEvent::Order(OrderEvent::Paid { order_id, lines, .. }) = event else {
            return Ok(());
        };
        for line in lines {
            // A product deleted after checkout has no stock left to release.
            if let Err(error) = self.store.release_stock(line.product_id, line.qty).await {
                tracing::warn!(%order_id, product_id = %line.product_id, %error, "stock not released");
            }
        }
        Ok(())
    }
}
