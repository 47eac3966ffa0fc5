//! Simulated Pix Provider
//!
//! For test mode and development. Generates a random txid and a BR Code
//! shaped payload locally; the QR image comes from a public renderer.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use reqwest::Url;

use checkout_core::error::{CheckoutError, Result};

use crate::brcode;
use crate::provider::{ChargeProvider, ChargeRequest, ChargeResult};

/// Public QR-code rendering endpoint
pub const QR_RENDER_URL: &str = "https://api.qrserver.com/v1/create-qr-code/";

/// Pix txids are at most 35 alphanumeric characters
pub const TXID_LEN: usize = 35;

/// Simulated provider with locally generated charges
pub struct SimulatedPix {
    qr_render_url: String,
}

impl Default for SimulatedPix {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedPix {
    pub fn new() -> Self {
        Self {
            qr_render_url: QR_RENDER_URL.into(),
        }
    }

    /// Random txid from the Pix alphabet
    pub fn generate_txid() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TXID_LEN)
            .map(char::from)
            .collect()
    }

    /// Renderer URL with `payload` URL-encoded as `data`
    pub fn qr_code_url(&self, payload: &str) -> Result<String> {
        Url::parse_with_params(&self.qr_render_url, &[("size", "300x300"), ("data", payload)])
            .map(String::from)
            .map_err(|e| CheckoutError::ChargeCreation(format!("invalid QR renderer URL: {e}")))
    }
}

#[async_trait]
impl ChargeProvider for SimulatedPix {
    async fn create_charge(&self, request: &ChargeRequest) -> Result<ChargeResult> {
        request.validate()?;

        let transaction_id = Self::generate_txid();
        let copy_paste = brcode::simulated_payload(&transaction_id, request.amount);
        let qr_code = self.qr_code_url(&copy_paste)?;
        let expires_at = Utc::now() + Duration::seconds(i64::from(request.expires_in_secs));

        tracing::info!(
            txid = %transaction_id,
            amount = %brcode::format_amount(request.amount),
            payer = %request.payer_email,
            "Generated simulated Pix charge"
        );

        Ok(ChargeResult {
            transaction_id,
            copy_paste,
            qr_code,
            expires_at,
        })
    }

    fn name(&self) -> &str {
        "SimulatedPix"
    }

    fn is_simulated(&self) -> bool {
        true
    }
}
