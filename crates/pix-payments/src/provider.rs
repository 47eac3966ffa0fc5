//! Charge Provider Strategy Pattern
//!
//! Common interface for issuing Pix charges. The orchestrators only see
//! `dyn ChargeProvider`; which implementation runs is decided once, from
//! configuration, when the process starts.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use checkout_core::config::Config;
use checkout_core::error::{CheckoutError, Result};
use checkout_core::model::{CHARGE_TTL_SECS, ChargeFields};

use crate::efi::EfiPixClient;
use crate::simulated::SimulatedPix;

/// A request for one Pix charge
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub amount: Decimal,
    pub payer_name: String,
    pub payer_email: String,

    /// Seconds until the charge expires
    #[serde(default = "default_expires_in")]
    pub expires_in_secs: u32,
}

const fn default_expires_in() -> u32 {
    CHARGE_TTL_SECS
}

impl ChargeRequest {
    pub fn new(amount: Decimal, payer_name: impl Into<String>, payer_email: impl Into<String>) -> Self {
        Self {
            amount,
            payer_name: payer_name.into(),
            payer_email: payer_email.into(),
            expires_in_secs: default_expires_in(),
        }
    }

    #[must_use]
    pub const fn expires_in(mut self, secs: u32) -> Self {
        self.expires_in_secs = secs;
        self
    }

    /// Reject zero and negative amounts before talking to anyone
    pub fn validate(&self) -> Result<()> {
        if self.amount <= Decimal::ZERO {
            return Err(CheckoutError::ChargeCreation(format!(
                "amount must be positive, got {}",
                self.amount
            )));
        }
        Ok(())
    }
}

/// A created Pix charge
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeResult {
    /// Provider transaction id (txid)
    pub transaction_id: String,

    /// "Pix copia e cola" payload
    pub copy_paste: String,

    /// QR code image reference (URL or data URI)
    pub qr_code: String,
    pub expires_at: DateTime<Utc>,
}

impl ChargeResult {
    pub fn fields(&self) -> ChargeFields {
        ChargeFields {
            transaction_id: self.transaction_id.clone(),
            copy_paste: self.copy_paste.clone(),
            qr_code: self.qr_code.clone(),
        }
    }
}

/// Charge provider trait (Strategy pattern)
#[async_trait]
pub trait ChargeProvider: Send + Sync {
    /// Issue a charge for `request.amount`
    async fn create_charge(&self, request: &ChargeRequest) -> Result<ChargeResult>;

    /// Provider name
    fn name(&self) -> &str;

    /// Whether charges are generated locally
    fn is_simulated(&self) -> bool {
        false
    }
}

/// Pick the provider for this process: simulated in test mode or when no
/// client certificate is configured, the real Pix API otherwise.
pub fn provider_from_config(config: &Config) -> Result<Arc<dyn ChargeProvider>> {
    if config.uses_simulated_charges() {
        tracing::info!(
            test_mode = config.pix.test_mode,
            certificate = config.pix.certificate.is_some(),
            "Using simulated Pix charges"
        );
        return Ok(Arc::new(SimulatedPix::new()));
    }

    let client = EfiPixClient::from_settings(&config.pix)?;
    tracing::info!(base_url = %client.base_url(), "Using Pix provider API");
    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_request_defaults() {
        let request = ChargeRequest::new(dec!(10), "Ana", "ana@x.com");
        assert_eq!(request.expires_in_secs, 3600);
        assert_eq!(request.expires_in(60).expires_in_secs, 60);
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        assert!(ChargeRequest::new(dec!(0), "Ana", "ana@x.com").validate().is_err());
        assert!(ChargeRequest::new(dec!(-1), "Ana", "ana@x.com").validate().is_err());
        assert!(ChargeRequest::new(dec!(0.01), "Ana", "ana@x.com").validate().is_ok());
    }

    #[test]
    fn test_simulated_without_certificate() {
        let config = Config::from_lookup(|_| None).unwrap();
        let provider = provider_from_config(&config).unwrap();
        assert!(provider.is_simulated());
    }

    #[test]
    fn test_missing_certificate_file_is_config_error() {
        let config = Config::from_lookup(|key| match key {
            "PIX_CERTIFICATE" => Some("/nonexistent/cert.p12".into()),
            _ => None,
        })
        .unwrap();
        let err = provider_from_config(&config).err().unwrap();
        assert!(matches!(err, CheckoutError::Configuration(_)));
    }
}
