//! # checkout-flow
//!
//! Orchestrators that turn a customer's intent into a persisted, payable
//! Pix charge.
//!
//! - [`CheckoutSubmitter`] prices a checkout, records the payment and
//!   issues its charge. Charge fields are attached by the
//!   [`ChargeUpdateWorker`] in the background.
//! - [`UpsellCharger`] charges a post-purchase offer as a separate
//!   transaction linked to the original payment.
//!
//! Both take the store and the configuration-selected provider at
//! construction:
//!
//! ```rust,ignore
//! let (updates, worker) = ChargeUpdateQueue::channel(store.clone());
//! tokio::spawn(worker.run());
//!
//! let submitter = CheckoutSubmitter::new(store.clone(), provider.clone(), updates);
//! let upsells = UpsellCharger::new(store, provider);
//! ```

pub mod outbox;
pub mod submission;
pub mod upsell;

#[cfg(test)]
mod testing;

pub use outbox::{ChargeUpdate, ChargeUpdateQueue, ChargeUpdateWorker, OutboxStats};
pub use submission::{CheckoutSubmitter, SubmissionRequest, SubmissionResult, price_checkout};
pub use upsell::{UpsellCharger, UpsellChargeRequest, UpsellChargeResponse, UpsellChargeResult};
