//! # pix-payments
//!
//! Pix charge generation and payment reconciliation.
//!
//! ## Providers
//!
//! Charges are issued through the [`ChargeProvider`] trait. Two
//! implementations exist and one is chosen from configuration at start-up:
//!
//! ```text
//! ┌──────────────┐   test mode / no certificate   ┌────────────────┐
//! │    Config    │──────────────────────────────▶│  SimulatedPix  │
//! │              │                               └────────────────┘
//! │              │   certificate configured      ┌────────────────┐
//! │              │──────────────────────────────▶│  EfiPixClient  │──▶ Pix API (mTLS)
//! └──────────────┘                               └────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pix_payments::{ChargeRequest, provider_from_config};
//!
//! let provider = provider_from_config(&config)?;
//! let charge = provider
//!     .create_charge(&ChargeRequest::new(dec!(117.00), "Ana", "ana@x.com"))
//!     .await?;
//!
//! // Show charge.copy_paste and charge.qr_code to the payer
//! ```

pub mod brcode;
mod efi;
mod provider;
mod simulated;
mod webhook;

pub use efi::EfiPixClient;
pub use provider::{ChargeProvider, ChargeRequest, ChargeResult, provider_from_config};
pub use simulated::SimulatedPix;
pub use webhook::{
    PixNotification, PixReceipt, ReconcileOutcome, Reconciliation, RecordKind, WebhookHandler,
};
