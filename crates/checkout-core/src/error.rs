//! Error Types

use thiserror::Error;

use crate::model::PaymentStatus;

/// Result type alias for checkout operations
pub type Result<T> = std::result::Result<T, CheckoutError>;

/// Fallback text when an error carries no message
pub const UNKNOWN_ERROR: &str = "Erro desconhecido";

/// Checkout and payment error types
#[derive(Error, Debug)]
pub enum CheckoutError {
    /// Missing or malformed setting
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Checkout missing or inactive
    #[error("Checkout não encontrado ou inativo")]
    CheckoutNotFound(String),

    /// Parent payment missing
    #[error("Pagamento não encontrado")]
    PaymentNotFound(String),

    /// Upsell offer missing
    #[error("Upsell não encontrado")]
    UpsellNotFound(String),

    /// Provider credential exchange failed
    #[error("Falha na autenticação com o provedor Pix: {0}")]
    Authentication(String),

    /// Provider rejected the charge or QR request
    #[error("Falha ao gerar cobrança Pix: {0}")]
    ChargeCreation(String),

    /// Store write failed or returned no row
    #[error("Falha ao salvar pagamento: {0}")]
    Persistence(String),

    /// Malformed request or notification body
    #[error("Requisição inválida: {0}")]
    InvalidRequest(String),

    /// Status change not allowed by the state machine
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },
}

impl CheckoutError {
    /// Lookup misses, as opposed to provider or storage failures
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::CheckoutNotFound(_) | Self::PaymentNotFound(_) | Self::UpsellNotFound(_)
        )
    }

    /// Message placed in the `error` field of the JSON envelopes
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            UNKNOWN_ERROR.into()
        } else {
            message
        }
    }

    /// Wrap any non-charge failure as `ChargeCreation`, keeping its message
    #[must_use]
    pub fn into_charge_creation(self) -> Self {
        match self {
            Self::ChargeCreation(_) => self,
            other => Self::ChargeCreation(other.to_string()),
        }
    }
}
