//! Upsell Charges
//!
//! Charges a post-purchase offer as its own Pix transaction, linked to the
//! original payment. Callers get a `{success, ...}` envelope; failures are
//! logged and reshaped rather than raised.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use checkout_core::error::{CheckoutError, Result};
use checkout_core::model::{CHARGE_TTL_SECS, NewUpsellPayment};
use checkout_core::store::CheckoutStore;
use pix_payments::{ChargeProvider, ChargeRequest};

/// Accepted upsell offer
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsellChargeRequest {
    pub payment_id: Uuid,
    pub upsell_id: Uuid,
}

/// Created upsell charge
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsellChargeResult {
    pub upsell_payment_id: Uuid,
    #[serde(rename = "qrCodeReference")]
    pub qr_code: String,
    #[serde(rename = "copyPasteString")]
    pub copy_paste: String,
    pub transaction_id: String,
}

/// Wire envelope: `{success:true, ...}` or `{success:false, error}`
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum UpsellChargeResponse {
    Charged {
        success: bool,
        #[serde(flatten)]
        result: UpsellChargeResult,
    },
    Failed {
        success: bool,
        error: String,
    },
}

impl UpsellChargeResponse {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Charged { .. })
    }
}

impl From<Result<UpsellChargeResult>> for UpsellChargeResponse {
    fn from(result: Result<UpsellChargeResult>) -> Self {
        match result {
            Ok(result) => Self::Charged { success: true, result },
            Err(e) => Self::Failed {
                success: false,
                error: e.user_message(),
            },
        }
    }
}

/// Upsell charge orchestrator
pub struct UpsellCharger {
    store: Arc<dyn CheckoutStore>,
    provider: Arc<dyn ChargeProvider>,
}

impl UpsellCharger {
    pub fn new(store: Arc<dyn CheckoutStore>, provider: Arc<dyn ChargeProvider>) -> Self {
        Self { store, provider }
    }

    /// Charge `upsell_id` against the order `payment_id`
    pub async fn charge(&self, payment_id: Uuid, upsell_id: Uuid) -> Result<UpsellChargeResult> {
        let parent = self
            .store
            .find_payment(payment_id)
            .await?
            .ok_or_else(|| CheckoutError::PaymentNotFound(payment_id.to_string()))?;

        let upsell = self
            .store
            .find_upsell(upsell_id)
            .await?
            .ok_or_else(|| CheckoutError::UpsellNotFound(upsell_id.to_string()))?;

        let payment = &parent.payment;
        let request = ChargeRequest::new(upsell.price, &payment.customer_name, &payment.customer_email)
            .expires_in(CHARGE_TTL_SECS);
        let charge = self.provider.create_charge(&request).await?;

        if charge.transaction_id.is_empty() {
            return Err(CheckoutError::ChargeCreation("provider returned no txid".into()));
        }

        let upsell_payment = self
            .store
            .insert_upsell_payment(NewUpsellPayment {
                payment_id: payment.id,
                upsell_id: upsell.id,
                amount: upsell.price,
                charge: charge.fields(),
                expires_at: charge.expires_at,
            })
            .await
            .map_err(|e| match e {
                CheckoutError::Persistence(_) => e,
                other => CheckoutError::Persistence(other.to_string()),
            })?;

        tracing::info!(
            upsell_payment_id = %upsell_payment.id,
            payment_id = %payment.id,
            upsell_id = %upsell.id,
            producer_id = ?parent.producer_id,
            amount = %upsell.price,
            txid = %charge.transaction_id,
            "Created upsell charge"
        );

        Ok(UpsellChargeResult {
            upsell_payment_id: upsell_payment.id,
            qr_code: charge.qr_code,
            copy_paste: charge.copy_paste,
            transaction_id: charge.transaction_id,
        })
    }

    /// Same as [`charge`](Self::charge), reshaped into the wire envelope
    pub async fn respond(&self, request: UpsellChargeRequest) -> UpsellChargeResponse {
        let result = self.charge(request.payment_id, request.upsell_id).await;
        if let Err(ref e) = result {
            tracing::error!(
                payment_id = %request.payment_id,
                upsell_id = %request.upsell_id,
                error = %e,
                "Upsell charge failed"
            );
        }
        result.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BlankTxidProvider, FailingProvider, FaultyStore, catalog_store};
    use chrono::Utc;
    use checkout_core::model::{NewPayment, PaymentStatus, default_expiry};
    use checkout_core::store::MemoryStore;
    use pix_payments::SimulatedPix;
    use rust_decimal_macros::dec;

    async fn paid_order(store: &MemoryStore, checkout_id: Uuid) -> Uuid {
        let view = store.find_active_checkout(checkout_id).await.unwrap().unwrap();
        let payment = store
            .insert_payment(NewPayment {
                checkout_id,
                customer_name: "Ana".into(),
                customer_email: "ana@x.com".into(),
                customer_data: serde_json::json!({}),
                amounts: crate::submission::price_checkout(&view, false).unwrap(),
                expires_at: default_expiry(Utc::now()),
            })
            .await
            .unwrap();
        store
            .set_payment_status(payment.id, PaymentStatus::Paid, Some(Utc::now()))
            .await
            .unwrap();
        payment.id
    }

    #[tokio::test]
    async fn test_charge_upsell() {
        let (store, fixture) = catalog_store(&[]);
        let payment_id = paid_order(&store, fixture.checkout_id).await;
        let charger = UpsellCharger::new(store.clone(), Arc::new(SimulatedPix::new()));

        let before = Utc::now();
        let result = charger.charge(payment_id, fixture.upsell_id).await.unwrap();
        assert_eq!(result.transaction_id.len(), 35);
        assert!(result.copy_paste.contains("4700"));

        let stored = store.find_upsell_payment(result.upsell_payment_id).await.unwrap().unwrap();
        assert_eq!(stored.payment_id, payment_id);
        assert_eq!(stored.upsell_id, fixture.upsell_id);
        assert_eq!(stored.amount, dec!(47.00));
        assert_eq!(stored.status, PaymentStatus::Pending);
        assert_eq!(stored.charge.transaction_id, result.transaction_id);
        assert!(stored.expires_at >= before + chrono::Duration::seconds(3600));

        let parent = store.find_payment(payment_id).await.unwrap().unwrap();
        assert_eq!(parent.producer_id, Some(fixture.producer_id));
    }

    #[tokio::test]
    async fn test_unknown_upsell_envelope() {
        let (store, fixture) = catalog_store(&[]);
        let payment_id = paid_order(&store, fixture.checkout_id).await;
        let charger = UpsellCharger::new(store.clone(), Arc::new(SimulatedPix::new()));

        let response = charger
            .respond(UpsellChargeRequest { payment_id, upsell_id: Uuid::new_v4() })
            .await;

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "error": "Upsell não encontrado"}));
        assert_eq!(store.upsell_payment_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_payment() {
        let (store, fixture) = catalog_store(&[]);
        let charger = UpsellCharger::new(store, Arc::new(SimulatedPix::new()));

        let err = charger.charge(Uuid::new_v4(), fixture.upsell_id).await.unwrap_err();
        assert!(matches!(err, CheckoutError::PaymentNotFound(_)));
    }

    #[tokio::test]
    async fn test_success_envelope_shape() {
        let (store, fixture) = catalog_store(&[]);
        let payment_id = paid_order(&store, fixture.checkout_id).await;
        let charger = UpsellCharger::new(store, Arc::new(SimulatedPix::new()));

        let response = charger
            .respond(UpsellChargeRequest { payment_id, upsell_id: fixture.upsell_id })
            .await;
        assert!(response.is_success());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert!(json["upsellPaymentId"].is_string());
        assert!(json["qrCodeReference"].is_string());
        assert!(json["copyPasteString"].is_string());
        assert!(json["transactionId"].is_string());
    }

    #[tokio::test]
    async fn test_blank_txid_is_charge_error() {
        let (store, fixture) = catalog_store(&[]);
        let payment_id = paid_order(&store, fixture.checkout_id).await;
        let charger = UpsellCharger::new(store.clone(), Arc::new(BlankTxidProvider));

        let err = charger.charge(payment_id, fixture.upsell_id).await.unwrap_err();
        assert!(matches!(err, CheckoutError::ChargeCreation(_)));
        assert_eq!(store.upsell_payment_count().await, 0);
    }

    #[tokio::test]
    async fn test_provider_auth_failure_creates_no_row() {
        let (store, fixture) = catalog_store(&[]);
        let payment_id = paid_order(&store, fixture.checkout_id).await;
        let charger = UpsellCharger::new(store.clone(), Arc::new(FailingProvider::auth()));

        let response = charger
            .respond(UpsellChargeRequest { payment_id, upsell_id: fixture.upsell_id })
            .await;
        assert!(!response.is_success());
        assert_eq!(store.upsell_payment_count().await, 0);
    }

    #[tokio::test]
    async fn test_insert_failure_envelope() {
        let (inner, fixture) = catalog_store(&[]);
        let payment_id = paid_order(&inner, fixture.checkout_id).await;
        let store = Arc::new(FaultyStore::failing_inserts(inner.clone()));
        let charger = UpsellCharger::new(store, Arc::new(SimulatedPix::new()));

        let err = charger.charge(payment_id, fixture.upsell_id).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Persistence(_)));

        let response = charger
            .respond(UpsellChargeRequest { payment_id, upsell_id: fixture.upsell_id })
            .await;
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().starts_with("Falha ao salvar pagamento"));
        assert_eq!(inner.upsell_payment_count().await, 0);
    }
}
