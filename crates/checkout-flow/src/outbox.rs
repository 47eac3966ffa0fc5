//! Charge Update Outbox
//!
//! When the submission cannot attach charge fields to the payment row
//! inline, the write moves here, to a background worker fed through a
//! channel. A failed write is re-attempted a bounded number of times and
//! then logged. The submitter never sees it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use uuid::Uuid;

use checkout_core::model::ChargeFields;
use checkout_core::store::CheckoutStore;

/// Charge fields waiting to be written onto a payment
#[derive(Clone, Debug)]
pub struct ChargeUpdate {
    pub payment_id: Uuid,
    pub charge: ChargeFields,
}

/// Sending half, cloned into every orchestrator
#[derive(Clone)]
pub struct ChargeUpdateQueue {
    tx: mpsc::UnboundedSender<ChargeUpdate>,
}

impl ChargeUpdateQueue {
    /// Create a queue and the worker that drains it
    pub fn channel(store: Arc<dyn CheckoutStore>) -> (Self, ChargeUpdateWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = ChargeUpdateWorker {
            store,
            rx,
            max_attempts: 3,
            retry_delay: Duration::from_millis(500),
        };
        (Self { tx }, worker)
    }

    /// Hand an update to the worker. Never fails the caller.
    pub fn enqueue(&self, update: ChargeUpdate) {
        let payment_id = update.payment_id;
        if self.tx.send(update).is_err() {
            tracing::error!(
                payment_id = %payment_id,
                "Charge update worker is gone; charge fields not persisted"
            );
        }
    }
}

/// Totals reported when the worker stops
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OutboxStats {
    pub applied: usize,
    pub failed: usize,
}

/// Receiving half; run it on its own task
pub struct ChargeUpdateWorker {
    store: Arc<dyn CheckoutStore>,
    rx: mpsc::UnboundedReceiver<ChargeUpdate>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl ChargeUpdateWorker {
    /// Override attempts per update and the base delay between them
    #[must_use]
    pub fn with_retry(mut self, max_attempts: u32, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    /// Process updates until every queue handle is dropped
    pub async fn run(mut self) -> OutboxStats {
        let mut stats = OutboxStats::default();
        while let Some(update) = self.rx.recv().await {
            if self.apply(&update).await {
                stats.applied += 1;
            } else {
                stats.failed += 1;
            }
        }
        tracing::debug!(applied = stats.applied, failed = stats.failed, "Charge update worker stopped");
        stats
    }

    async fn apply(&self, update: &ChargeUpdate) -> bool {
        for attempt in 1..=self.max_attempts {
            match self.store.attach_charge(update.payment_id, &update.charge).await {
                Ok(()) => {
                    tracing::debug!(
                        payment_id = %update.payment_id,
                        txid = %update.charge.transaction_id,
                        "Attached charge to payment"
                    );
                    return true;
                }
                Err(e) => {
                    tracing::warn!(
                        payment_id = %update.payment_id,
                        attempt,
                        error = %e,
                        "Failed to attach charge to payment"
                    );
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_delay * attempt).await;
                    }
                }
            }
        }

        tracing::error!(
            payment_id = %update.payment_id,
            txid = %update.charge.transaction_id,
            "Giving up on charge update; payment stays without charge fields"
        );
        false
    }
}
