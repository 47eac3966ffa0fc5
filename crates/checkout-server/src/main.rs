//! Pix Checkout HTTP Server
//!
//! Axum server exposing checkout submission, upsell charges, payment
//! status and the Pix provider webhook.

mod api;
mod handlers;
mod state;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use checkout_core::{Catalog, CheckoutStore, Config, MemoryStore};
use pix_payments::provider_from_config;

use crate::api::create_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment before anything reads it
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Missing production settings abort start-up here
    let config = Config::from_env()?;
    tracing::info!(
        environment = config.environment.as_str(),
        sandbox = config.pix.sandbox,
        test_mode = config.pix.test_mode,
        "Configuration loaded"
    );
    if !config.is_notifier_configured() {
        tracing::warn!("Notifier not configured - set NOTIFIER_API_TOKEN and NOTIFIER_SENDER_ID in .env");
    }
    if config.webhook_secret.is_none() {
        tracing::warn!("PIX_WEBHOOK_SECRET not set - webhook calls are not authenticated");
    }

    // Seed the store
    let store: Arc<dyn CheckoutStore> = match std::env::var("CATALOG_PATH") {
        Ok(path) => {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("reading catalog {path}"))?;
            let catalog = Catalog::from_json(&raw)?;
            tracing::info!(
                path = %path,
                products = catalog.products.len(),
                checkouts = catalog.checkouts.len(),
                upsells = catalog.upsells.len(),
                "Catalog loaded"
            );
            Arc::new(MemoryStore::with_catalog(catalog))
        }
        Err(_) => {
            tracing::warn!("CATALOG_PATH not set - starting with an empty catalog");
            Arc::new(MemoryStore::new())
        }
    };

    // Charge provider
    let provider = provider_from_config(&config)?;
    tracing::info!("✓ Charge provider: {}", provider.name());

    let (state, worker) = AppState::new(config, store, provider);
    tokio::spawn(async move {
        let stats = worker.run().await;
        tracing::info!(applied = stats.applied, failed = stats.failed, "Charge update worker finished");
    });

    let app = create_router(state);

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 checkout server running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                   - Health check");
    tracing::info!("  POST /api/checkout/pix         - Submit checkout");
    tracing::info!("  POST /api/upsell/charge        - Charge upsell");
    tracing::info!("  GET  /api/payments/:id         - Payment status");
    tracing::info!("  GET  /api/upsell-payments/:id  - Upsell payment status");
    tracing::info!("  POST /webhook/pix              - Pix notifications");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
