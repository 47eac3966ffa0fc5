//! # checkout-core
//!
//! Domain model, configuration and storage contracts for the Pix checkout.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      checkout-server                          │
//! │  ┌──────────────────┐   ┌──────────────────┐                  │
//! │  │  checkout-flow   │──▶│   pix-payments   │──▶ Pix provider  │
//! │  │ (orchestrators)  │   │ (ChargeProvider) │                  │
//! │  └────────┬─────────┘   └──────────────────┘                  │
//! │           ▼                                                   │
//! │  ┌──────────────────────────────────────────┐                 │
//! │  │ checkout-core: Config, model, CheckoutStore│               │
//! │  └──────────────────────────────────────────┘                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod store;

pub use config::{Config, Environment, PixSettings};
pub use error::{CheckoutError, Result};
pub use model::{
    ChargeFields, Checkout, CheckoutView, NewPayment, NewUpsellPayment, OrderBump, Payment,
    PaymentAmounts, PaymentRecord, PaymentStatus, Product, Upsell, UpsellPayment,
};
pub use store::{Catalog, CheckoutStore, MemoryStore};
