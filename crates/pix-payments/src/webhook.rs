//! Pix Webhook Handling
//!
//! Applies the provider's payment confirmations to payment records. Each
//! notified txid is matched against payments first, then upsell payments,
//! and moved to `paid` through the status state machine.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use checkout_core::error::{CheckoutError, Result};
use checkout_core::model::PaymentStatus;
use checkout_core::store::CheckoutStore;

/// Provider notification body
#[derive(Clone, Debug, Deserialize)]
pub struct PixNotification {
    #[serde(default)]
    pub pix: Vec<PixReceipt>,
}

/// One confirmed Pix transfer
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixReceipt {
    pub txid: Option<String>,
    #[serde(default)]
    pub end_to_end_id: Option<String>,

    /// Amount paid, as a decimal string
    #[serde(default)]
    pub valor: Option<Decimal>,
    #[serde(default)]
    pub horario: Option<DateTime<Utc>>,
}

/// Which record a txid resolved to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Payment,
    UpsellPayment,
}

/// What happened to one receipt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reconciliation {
    Paid,
    AlreadyPaid,
    Rejected,
    Unknown,
}

/// Per-receipt outcome
#[derive(Clone, Debug, Serialize)]
pub struct ReconcileOutcome {
    pub txid: Option<String>,
    pub record: Option<RecordKind>,
    pub record_id: Option<Uuid>,
    pub result: Reconciliation,
}

impl ReconcileOutcome {
    const fn unknown(txid: Option<String>) -> Self {
        Self {
            txid,
            record: None,
            record_id: None,
            result: Reconciliation::Unknown,
        }
    }
}

/// Webhook handler
pub struct WebhookHandler {
    store: Arc<dyn CheckoutStore>,
}

impl WebhookHandler {
    pub fn new(store: Arc<dyn CheckoutStore>) -> Self {
        Self { store }
    }

    /// Check the shared secret the provider echoes back as `hmac`
    pub fn verify_secret(expected: Option<&str>, provided: Option<&str>) -> bool {
        match expected {
            None => true,
            Some(expected) => provided == Some(expected),
        }
    }

    /// Parse a raw notification body
    pub fn parse(body: &str) -> Result<PixNotification> {
        serde_json::from_str(body)
            .map_err(|e| CheckoutError::InvalidRequest(format!("invalid Pix notification: {e}")))
    }

    /// Process a notification; one outcome per receipt
    pub async fn handle(&self, notification: PixNotification) -> Result<Vec<ReconcileOutcome>> {
        tracing::info!(receipts = notification.pix.len(), "Processing Pix webhook");

        let mut outcomes = Vec::with_capacity(notification.pix.len());
        for receipt in notification.pix {
            outcomes.push(self.reconcile(receipt).await?);
        }
        Ok(outcomes)
    }

    async fn reconcile(&self, receipt: PixReceipt) -> Result<ReconcileOutcome> {
        let Some(txid) = receipt.txid.clone().filter(|t| !t.is_empty()) else {
            tracing::debug!(end_to_end_id = ?receipt.end_to_end_id, "Pix receipt without txid");
            return Ok(ReconcileOutcome::unknown(None));
        };
        let paid_at = receipt.horario.unwrap_or_else(Utc::now);

        if let Some(payment) = self.store.find_payment_by_txid(&txid).await? {
            warn_on_amount_mismatch(&txid, payment.total_amount, receipt.valor);
            let result = match payment.status.transition(PaymentStatus::Paid) {
                Ok(true) => {
                    self.store
                        .set_payment_status(payment.id, PaymentStatus::Paid, Some(paid_at))
                        .await?;
                    tracing::info!(payment_id = %payment.id, txid = %txid, "Payment confirmed");
                    Reconciliation::Paid
                }
                Ok(false) => Reconciliation::AlreadyPaid,
                Err(e) => {
                    tracing::warn!(payment_id = %payment.id, txid = %txid, error = %e, "Ignoring Pix confirmation");
                    Reconciliation::Rejected
                }
            };
            return Ok(ReconcileOutcome {
                txid: Some(txid),
                record: Some(RecordKind::Payment),
                record_id: Some(payment.id),
                result,
            });
        }

        if let Some(upsell_payment) = self.store.find_upsell_payment_by_txid(&txid).await? {
            warn_on_amount_mismatch(&txid, upsell_payment.amount, receipt.valor);
            let result = match upsell_payment.status.transition(PaymentStatus::Paid) {
                Ok(true) => {
                    self.store
                        .set_upsell_payment_status(upsell_payment.id, PaymentStatus::Paid, Some(paid_at))
                        .await?;
                    tracing::info!(upsell_payment_id = %upsell_payment.id, txid = %txid, "Upsell payment confirmed");
                    Reconciliation::Paid
                }
                Ok(false) => Reconciliation::AlreadyPaid,
                Err(e) => {
                    tracing::warn!(upsell_payment_id = %upsell_payment.id, txid = %txid, error = %e, "Ignoring Pix confirmation");
                    Reconciliation::Rejected
                }
            };
            return Ok(ReconcileOutcome {
                txid: Some(txid),
                record: Some(RecordKind::UpsellPayment),
                record_id: Some(upsell_payment.id),
                result,
            });
        }

        tracing::warn!(txid = %txid, "Pix confirmation for unknown txid");
        Ok(ReconcileOutcome::unknown(Some(txid)))
    }
}

fn warn_on_amount_mismatch(txid: &str, expected: Decimal, paid: Option<Decimal>) {
    if let Some(paid) = paid {
        if paid != expected {
            tracing::warn!(txid = %txid, expected = %expected, paid = %paid, "Pix amount differs from charge");
        }
    }
}
