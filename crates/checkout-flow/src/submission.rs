//! Checkout Submission
//!
//! Prices a checkout, records the purchase attempt and issues its Pix
//! charge. The payment row is written before the provider is called. The
//! charge fields are attached before the payer sees the txid, so a provider
//! confirmation can always find the row; if that write fails they go
//! through the update outbox instead.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use checkout_core::error::{CheckoutError, Result};
use checkout_core::model::{CheckoutView, NewPayment, PaymentAmounts, default_expiry};
use checkout_core::store::CheckoutStore;
use pix_payments::{ChargeProvider, ChargeRequest};

use crate::outbox::{ChargeUpdate, ChargeUpdateQueue};

/// Customer's checkout form
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub checkout_id: Uuid,
    pub customer_name: String,
    pub customer_email: String,

    /// Stored as-is on the payment
    #[serde(default)]
    pub customer_data: serde_json::Value,
    #[serde(default)]
    pub include_bump: bool,
}

/// What the payer needs to pay
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub payment_id: Uuid,
    pub transaction_id: String,
    #[serde(rename = "copyPasteString")]
    pub copy_paste: String,
    #[serde(rename = "qrCodeReference")]
    pub qr_code: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

/// Amounts for a checkout: the product price, plus the first order bump
/// when the customer accepted it. Further bumps are never applied.
pub fn price_checkout(view: &CheckoutView, include_bump: bool) -> Result<PaymentAmounts> {
    let bump = if include_bump {
        view.order_bumps.first().map_or(Decimal::ZERO, |b| b.price)
    } else {
        Decimal::ZERO
    };
    PaymentAmounts::new(view.product.price, bump)
}

/// Submission orchestrator
pub struct CheckoutSubmitter {
    store: Arc<dyn CheckoutStore>,
    provider: Arc<dyn ChargeProvider>,
    updates: ChargeUpdateQueue,
}

impl CheckoutSubmitter {
    pub fn new(
        store: Arc<dyn CheckoutStore>,
        provider: Arc<dyn ChargeProvider>,
        updates: ChargeUpdateQueue,
    ) -> Self {
        Self { store, provider, updates }
    }

    /// Submit a checkout and return its Pix charge.
    ///
    /// Every call creates a new payment row; repeated submissions are not
    /// deduplicated. If the charge fails the row stays `pending` without
    /// charge fields.
    pub async fn submit(&self, request: SubmissionRequest) -> Result<SubmissionResult> {
        let view = self
            .store
            .find_active_checkout(request.checkout_id)
            .await?
            .ok_or_else(|| CheckoutError::CheckoutNotFound(request.checkout_id.to_string()))?;

        let amounts = price_checkout(&view, request.include_bump)?;
        let total = amounts.total();

        let payment = self
            .store
            .insert_payment(NewPayment {
                checkout_id: view.checkout.id,
                customer_name: request.customer_name.clone(),
                customer_email: request.customer_email.clone(),
                customer_data: request.customer_data,
                amounts,
                expires_at: default_expiry(Utc::now()),
            })
            .await
            .map_err(|e| match e {
                CheckoutError::Persistence(_) => e,
                other => CheckoutError::Persistence(other.to_string()),
            })?;

        tracing::info!(
            payment_id = %payment.id,
            checkout_id = %view.checkout.id,
            amount = %payment.amount,
            bump_amount = %payment.bump_amount,
            total = %payment.total_amount,
            "Created pending payment"
        );

        let charge = self
            .provider
            .create_charge(&ChargeRequest::new(total, &request.customer_name, &request.customer_email))
            .await
            .map_err(|e| {
                tracing::error!(
                    payment_id = %payment.id,
                    provider = self.provider.name(),
                    error = %e,
                    "Pix charge failed; payment left pending"
                );
                e.into_charge_creation()
            })?;

        let fields = charge.fields();
        if let Err(e) = self.store.attach_charge(payment.id, &fields).await {
            tracing::warn!(
                payment_id = %payment.id,
                error = %e,
                "Attaching charge failed; handing it to the update worker"
            );
            self.updates.enqueue(ChargeUpdate {
                payment_id: payment.id,
                charge: fields,
            });
        }

        Ok(SubmissionResult {
            payment_id: payment.id,
            transaction_id: charge.transaction_id,
            copy_paste: charge.copy_paste,
            qr_code: charge.qr_code,
            total_amount: total,
        })
    }
}
