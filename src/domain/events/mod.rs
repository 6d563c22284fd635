//! Domain events
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::{PaymentMethod, Slug};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity", content = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
}

impl DomainEvent {
    /// Message-bus subject, e.g. `storefront.orders.paid`.
    pub fn subject(&self) -> String {
        let (entity, name) = match self {
            Self::Product(e) => ("products", e.name()),
            Self::Order(e) => ("orders", e.name()),
        };
        format!("storefront.{entity}.{name}")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductEvent {
    Created { product_id: Uuid, slug: Slug },
    Updated { product_id: Uuid, slug: Slug },
    Deleted { product_id: Uuid },
}

impl ProductEvent {
    fn name(&self) -> &'static str {
        match self { Self::Created { .. } => "created", Self::Updated { .. } => "updated", Self::Deleted { .. } => "deleted" }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockLine { pub product_id: Uuid, pub qty: u32 }

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: Uuid, user_id: Uuid, total: Decimal },
    Paid { order_id: Uuid, method: PaymentMethod, paid_at: DateTime<Utc>, lines: Vec<StockLine> },
    Delivered { order_id: Uuid, delivered_at: DateTime<Utc> },
    Deleted { order_id: Uuid },
}

impl OrderEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Placed { .. } => "placed",
            Self::Paid { .. } => "paid",
            Self::Delivered { .. } => "delivered",
            Self::Deleted { .. } => "deleted",
        }
    }
}
