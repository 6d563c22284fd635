//! Storefront - order, payment and fulfillment service

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront::api::{self, AppState};
use storefront::config::Config;
use storefront::notify::{NatsNotifier, Notifiers, StockNotifier};
use storefront::payments::{DisabledProvider, PayPalClient, PaymentProvider};
use storefront::services::Services;
use storefront::store::{MemoryStore, PgStore, SharedStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("invalid configuration")?;

    let store: SharedStore = match &config.database_url {
        Some(url) => Arc::new(
            PgStore::connect(url, config.database_max_connections).await.context("failed to open the database")?,
        ),
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let mut notifiers = Notifiers::new().with(StockNotifier::new(Arc::clone(&store)));
    if let Some(url) = &config.nats_url {
        match async_nats::connect(url.as_str()).await {
            Ok(client) => notifiers = notifiers.with(NatsNotifier::new(client)),
            Err(error) => tracing::warn!(%error, "NATS unavailable, events will not be published"),
        }
    }

    let provider: Arc<dyn PaymentProvider> = match config.paypal.clone() {
        Some(credentials) => Arc::new(PayPalClient::new(credentials)),
        None => {
            tracing::warn!("PayPal credentials not set, only cash on delivery is available");
            Arc::new(DisabledProvider)
        }
    };

    let services = Services::new(store, provider, notifiers, config.shop.clone());
    let app = api::router(AppState::new(services));

    let addr = config.bind_addr();
    tracing::info!("storefront listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
