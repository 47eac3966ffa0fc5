//! Application State

use std::sync::Arc;

use checkout_core::{CheckoutStore, Config};
use checkout_flow::{ChargeUpdateQueue, ChargeUpdateWorker, CheckoutSubmitter, UpsellCharger};
use pix_payments::{ChargeProvider, WebhookHandler};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    /// Catalog and payment records
    pub store: Arc<dyn CheckoutStore>,

    /// Provider chosen from configuration (simulated or real)
    pub provider: Arc<dyn ChargeProvider>,

    pub submitter: Arc<CheckoutSubmitter>,
    pub upsells: Arc<UpsellCharger>,
    pub webhook: Arc<WebhookHandler>,
}

impl AppState {
    /// Wire the orchestrators. The returned worker must be spawned for
    /// charge fields to reach payment rows.
    pub fn new(
        config: Config,
        store: Arc<dyn CheckoutStore>,
        provider: Arc<dyn ChargeProvider>,
    ) -> (Self, ChargeUpdateWorker) {
        let (updates, worker) = ChargeUpdateQueue::channel(store.clone());

        let state = Self {
            config: Arc::new(config),
            submitter: Arc::new(CheckoutSubmitter::new(store.clone(), provider.clone(), updates)),
            upsells: Arc::new(UpsellCharger::new(store.clone(), provider.clone())),
            webhook: Arc::new(WebhookHandler::new(store.clone())),
            store,
            provider,
        };
        (state, worker)
    }
}
