//! Shared fixtures for the orchestrator tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use checkout_core::error::{CheckoutError, Result};
use checkout_core::model::{
    ChargeFields, Checkout, CheckoutView, NewPayment, NewUpsellPayment, OrderBump, Payment,
    PaymentRecord, PaymentStatus, Product, Upsell, UpsellPayment,
};
use checkout_core::store::{Catalog, CheckoutStore, MemoryStore};
use pix_payments::{ChargeProvider, ChargeRequest, ChargeResult, SimulatedPix};

pub struct Fixture {
    pub checkout_id: Uuid,
    pub inactive_checkout_id: Uuid,
    pub producer_id: Uuid,
    pub upsell_id: Uuid,
    pub view: CheckoutView,
}

/// Store with a 97.00 product, one active checkout carrying bumps priced
/// `bump_prices` (in order), one inactive checkout and a 47.00 upsell.
pub fn catalog_store(bump_prices: &[Decimal]) -> (Arc<MemoryStore>, Fixture) {
    let product = Product {
        id: Uuid::new_v4(),
        name: "Curso completo".into(),
        price: dec!(97.00),
    };
    let order_bumps: Vec<OrderBump> = bump_prices
        .iter()
        .enumerate()
        .map(|(i, price)| OrderBump {
            id: Uuid::new_v4(),
            name: format!("Bump {i}"),
            price: *price,
        })
        .collect();
    let producer_id = Uuid::new_v4();
    let checkout = Checkout {
        id: Uuid::new_v4(),
        product_id: product.id,
        producer_id,
        active: true,
        order_bump_ids: order_bumps.iter().map(|b| b.id).collect(),
    };
    let inactive = Checkout {
        id: Uuid::new_v4(),
        active: false,
        ..checkout.clone()
    };
    let upsell = Upsell {
        id: Uuid::new_v4(),
        name: "Mentoria".into(),
        price: dec!(47.00),
    };

    let fixture = Fixture {
        checkout_id: checkout.id,
        inactive_checkout_id: inactive.id,
        producer_id,
        upsell_id: upsell.id,
        view: CheckoutView {
            checkout: checkout.clone(),
            product: product.clone(),
            order_bumps: order_bumps.clone(),
        },
    };

    let store = MemoryStore::with_catalog(Catalog {
        products: vec![product],
        order_bumps,
        checkouts: vec![checkout, inactive],
        upsells: vec![upsell],
    });
    (Arc::new(store), fixture)
}

/// Provider that always fails
pub struct FailingProvider {
    error: fn() -> CheckoutError,
}

impl FailingProvider {
    pub fn auth() -> Self {
        Self {
            error: || CheckoutError::Authentication("token endpoint returned 401 Unauthorized".into()),
        }
    }
}

#[async_trait]
impl ChargeProvider for FailingProvider {
    async fn create_charge(&self, _request: &ChargeRequest) -> Result<ChargeResult> {
        Err((self.error)())
    }

    fn name(&self) -> &str {
        "Failing"
    }
}

/// Provider that answers without a transaction id
pub struct BlankTxidProvider;

#[async_trait]
impl ChargeProvider for BlankTxidProvider {
    async fn create_charge(&self, request: &ChargeRequest) -> Result<ChargeResult> {
        Ok(ChargeResult {
            transaction_id: String::new(),
            copy_paste: "000201".into(),
            qr_code: String::new(),
            expires_at: chrono::Utc::now() + chrono::Duration::seconds(i64::from(request.expires_in_secs)),
        })
    }

    fn name(&self) -> &str {
        "BlankTxid"
    }
}

/// Simulated provider that counts its calls
pub struct CountingProvider {
    inner: SimulatedPix,
    calls: AtomicUsize,
}

impl CountingProvider {
    pub fn new() -> Self {
        Self {
            inner: SimulatedPix::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChargeProvider for CountingProvider {
    async fn create_charge(&self, request: &ChargeRequest) -> Result<ChargeResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.create_charge(request).await
    }

    fn name(&self) -> &str {
        "Counting"
    }
}

/// `MemoryStore` whose writes can be made to fail
pub struct FaultyStore {
    inner: Arc<MemoryStore>,
    fail_inserts: bool,
    attach_failures: AtomicUsize,
}

impl FaultyStore {
    /// Every payment and upsell payment insert fails
    pub fn failing_inserts(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            fail_inserts: true,
            attach_failures: AtomicUsize::new(0),
        }
    }

    /// The first `count` charge attachments fail
    pub fn failing_attaches(inner: Arc<MemoryStore>, count: usize) -> Self {
        Self {
            inner,
            fail_inserts: false,
            attach_failures: AtomicUsize::new(count),
        }
    }

    fn insert_error(&self) -> Result<()> {
        if self.fail_inserts {
            return Err(CheckoutError::Persistence("insert returned no row".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CheckoutStore for FaultyStore {
    async fn find_active_checkout(&self, id: Uuid) -> Result<Option<CheckoutView>> {
        self.inner.find_active_checkout(id).await
    }

    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment> {
        self.insert_error()?;
        self.inner.insert_payment(payment).await
    }

    async fn attach_charge(&self, payment_id: Uuid, charge: &ChargeFields) -> Result<()> {
        let fail = self
            .attach_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            return Err(CheckoutError::Persistence("connection reset".into()));
        }
        self.inner.attach_charge(payment_id, charge).await
    }

    async fn find_payment(&self, id: Uuid) -> Result<Option<PaymentRecord>> {
        self.inner.find_payment(id).await
    }

    async fn find_payment_by_txid(&self, txid: &str) -> Result<Option<Payment>> {
        self.inner.find_payment_by_txid(txid).await
    }

    async fn set_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.inner.set_payment_status(id, status, paid_at).await
    }

    async fn find_upsell(&self, id: Uuid) -> Result<Option<Upsell>> {
        self.inner.find_upsell(id).await
    }

    async fn insert_upsell_payment(&self, payment: NewUpsellPayment) -> Result<UpsellPayment> {
        self.insert_error()?;
        self.inner.insert_upsell_payment(payment).await
    }

    async fn find_upsell_payment(&self, id: Uuid) -> Result<Option<UpsellPayment>> {
        self.inner.find_upsell_payment(id).await
    }

    async fn find_upsell_payment_by_txid(&self, txid: &str) -> Result<Option<UpsellPayment>> {
        self.inner.find_upsell_payment_by_txid(txid).await
    }

    async fn set_upsell_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.inner.set_upsell_payment_status(id, status, paid_at).await
    }
}
