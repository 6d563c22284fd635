//! Application services: one per area of the storefront.
//!
//! Services check permissions through [`crate::policy`], call the aggregates, persist through the
//! store and then hand the resulting event to the notifiers.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod fulfillment;
pub mod orders;
pub mod payments;
pub mod profile;

pub use cart::{CartService, CartView};
pub use catalog::CatalogService;
pub use checkout::{CheckoutService, PlacedOrder};
pub use fulfillment::FulfillmentService;
pub use orders::OrderService;
pub use payments::{ApprovalPayload, PaymentService};
pub use profile::ProfileService;

use std::sync::Arc;

use crate::config::ShopSettings;
use crate::notify::Notifiers;
use crate::payments::PaymentProvider;
use crate::store::SharedStore;

/// Every service wired to the same store and notifiers.
#[derive(Clone)]
pub struct Services {
    pub catalog: CatalogService,
    pub cart: CartService,
    pub checkout: CheckoutService,
    pub payments: PaymentService,
    pub fulfillment: FulfillmentService,
    pub orders: OrderService,
    pub profile: ProfileService,
}

impl Services {
    pub fn new(
        store: SharedStore,
        provider: Arc<dyn PaymentProvider>,
        notifiers: Notifiers,
        settings: ShopSettings,
    ) -> Self {
        let settings = Arc::new(settings);
        Self {
            catalog: CatalogService::new(Arc::clone(&store), notifiers.clone(), Arc::clone(&settings)),
            cart: CartService::new(Arc::clone(&store), Arc::clone(&settings)),
            checkout: CheckoutService::new(Arc::clone(&store), notifiers.clone(), Arc::clone(&settings)),
            payments: PaymentService::new(Arc::clone(&store), provider, notifiers.clone()),
            fulfillment: FulfillmentService::new(Arc::clone(&store), notifiers.clone()),
            orders: OrderService::new(Arc::clone(&store), notifiers, Arc::clone(&settings)),
            profile: ProfileService::new(store),
        }
    }
}
