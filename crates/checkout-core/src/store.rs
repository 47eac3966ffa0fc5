//! Checkout Storage
//!
//! The persistent store is an external collaborator; the flow only needs
//! point lookups, the active-checkout join, insert-returning-row and
//! update-by-id. `MemoryStore` backs development and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{CheckoutError, Result};
use crate::model::{
    ChargeFields, Checkout, CheckoutView, NewPayment, NewUpsellPayment, OrderBump, Payment,
    PaymentRecord, PaymentStatus, Product, Upsell, UpsellPayment,
};

/// Storage trait for catalog reads and payment state
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    /// Checkout joined with product and order bumps, only if active
    async fn find_active_checkout(&self, id: Uuid) -> Result<Option<CheckoutView>>;

    /// Insert a pending payment and return the stored row
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment>;

    /// Attach provider artifacts to a payment
    async fn attach_charge(&self, payment_id: Uuid, charge: &ChargeFields) -> Result<()>;

    /// Payment joined with the producer of its checkout
    async fn find_payment(&self, id: Uuid) -> Result<Option<PaymentRecord>>;

    async fn find_payment_by_txid(&self, txid: &str) -> Result<Option<Payment>>;

    async fn set_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    async fn find_upsell(&self, id: Uuid) -> Result<Option<Upsell>>;

    /// Insert a pending upsell payment and return the stored row
    async fn insert_upsell_payment(&self, payment: NewUpsellPayment) -> Result<UpsellPayment>;

    async fn find_upsell_payment(&self, id: Uuid) -> Result<Option<UpsellPayment>>;

    async fn find_upsell_payment_by_txid(&self, txid: &str) -> Result<Option<UpsellPayment>>;

    async fn set_upsell_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<()>;
}

/// Catalog snapshot used to seed a store
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub order_bumps: Vec<OrderBump>,
    #[serde(default)]
    pub checkouts: Vec<Checkout>,
    #[serde(default)]
    pub upsells: Vec<Upsell>,
}

impl Catalog {
    /// Parse a JSON catalog
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| CheckoutError::Configuration(format!("invalid catalog: {e}")))
    }
}

#[derive(Default)]
struct Tables {
    products: HashMap<Uuid, Product>,
    order_bumps: HashMap<Uuid, OrderBump>,
    checkouts: HashMap<Uuid, Checkout>,
    upsells: HashMap<Uuid, Upsell>,
    payments: HashMap<Uuid, Payment>,
    upsell_payments: HashMap<Uuid, UpsellPayment>,
}

/// In-memory store (for development and tests)
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store holding `catalog`
    pub fn with_catalog(catalog: Catalog) -> Self {
        let tables = Tables {
            products: catalog.products.into_iter().map(|p| (p.id, p)).collect(),
            order_bumps: catalog.order_bumps.into_iter().map(|b| (b.id, b)).collect(),
            checkouts: catalog.checkouts.into_iter().map(|c| (c.id, c)).collect(),
            upsells: catalog.upsells.into_iter().map(|u| (u.id, u)).collect(),
            ..Tables::default()
        };
        Self {
            tables: RwLock::new(tables),
        }
    }

    pub async fn payment_count(&self) -> usize {
        self.tables.read().await.payments.len()
    }

    pub async fn upsell_payment_count(&self) -> usize {
        self.tables.read().await.upsell_payments.len()
    }
}

#[async_trait]
impl CheckoutStore for MemoryStore {
    async fn find_active_checkout(&self, id: Uuid) -> Result<Option<CheckoutView>> {
        let tables = self.tables.read().await;

        let Some(checkout) = tables.checkouts.get(&id).filter(|c| c.active) else {
            return Ok(None);
        };
        let Some(product) = tables.products.get(&checkout.product_id) else {
            tracing::warn!(checkout_id = %id, product_id = %checkout.product_id, "Checkout references a missing product");
            return Ok(None);
        };

        let order_bumps = checkout
            .order_bump_ids
            .iter()
            .filter_map(|bump_id| tables.order_bumps.get(bump_id).cloned())
            .collect();

        Ok(Some(CheckoutView {
            checkout: checkout.clone(),
            product: product.clone(),
            order_bumps,
        }))
    }

    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment> {
        let payment = Payment::create(payment);
        let mut tables = self.tables.write().await;
        tables.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn attach_charge(&self, payment_id: Uuid, charge: &ChargeFields) -> Result<()> {
        let mut tables = self.tables.write().await;
        let payment = tables
            .payments
            .get_mut(&payment_id)
            .ok_or_else(|| CheckoutError::Persistence(format!("payment {payment_id} does not exist")))?;
        payment.charge = Some(charge.clone());
        Ok(())
    }

    async fn find_payment(&self, id: Uuid) -> Result<Option<PaymentRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.payments.get(&id).map(|payment| PaymentRecord {
            producer_id: tables
                .checkouts
                .get(&payment.checkout_id)
                .map(|c| c.producer_id),
            payment: payment.clone(),
        }))
    }

    async fn find_payment_by_txid(&self, txid: &str) -> Result<Option<Payment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .payments
            .values()
            .find(|p| p.transaction_id() == Some(txid))
            .cloned())
    }

    async fn set_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        let payment = tables
            .payments
            .get_mut(&id)
            .ok_or_else(|| CheckoutError::Persistence(format!("payment {id} does not exist")))?;
        payment.status = status;
        if paid_at.is_some() {
            payment.paid_at = paid_at;
        }
        Ok(())
    }

    async fn find_upsell(&self, id: Uuid) -> Result<Option<Upsell>> {
        Ok(self.tables.read().await.upsells.get(&id).cloned())
    }

    async fn insert_upsell_payment(&self, payment: NewUpsellPayment) -> Result<UpsellPayment> {
        let payment = UpsellPayment::create(payment);
        let mut tables = self.tables.write().await;
        tables.upsell_payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn find_upsell_payment(&self, id: Uuid) -> Result<Option<UpsellPayment>> {
        Ok(self.tables.read().await.upsell_payments.get(&id).cloned())
    }

    async fn find_upsell_payment_by_txid(&self, txid: &str) -> Result<Option<UpsellPayment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .upsell_payments
            .values()
            .find(|p| p.charge.transaction_id == txid)
            .cloned())
    }

    async fn set_upsell_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        let payment = tables
            .upsell_payments
            .get_mut(&id)
            .ok_or_else(|| CheckoutError::Persistence(format!("upsell payment {id} does not exist")))?;
        payment.status = status;
        if paid_at.is_some() {
            payment.paid_at = paid_at;
        }
        Ok(())
    }
}
