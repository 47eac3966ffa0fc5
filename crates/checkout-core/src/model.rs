//! Domain Models
//!
//! Catalog entities read by the checkout flow and the payment records it
//! writes. Uses `rust_decimal` for all monetary values.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CheckoutError, Result};

/// A sellable product
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
}

/// Add-on offered at the point of purchase
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderBump {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
}

/// A configured purchase page
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Checkout {
    pub id: Uuid,
    pub product_id: Uuid,
    pub producer_id: Uuid,
    #[serde(default = "default_active")]
    pub active: bool,

    /// Order matters: only the first bump is ever applied
    #[serde(default)]
    pub order_bump_ids: Vec<Uuid>,
}

const fn default_active() -> bool {
    true
}

/// Checkout joined with its product and order bumps
#[derive(Clone, Debug)]
pub struct CheckoutView {
    pub checkout: Checkout,
    pub product: Product,
    pub order_bumps: Vec<OrderBump>,
}

/// Post-purchase offer
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Upsell {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
}

/// Lifecycle of a charge record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Expired,
    Failed,
}

impl PaymentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Expired => "expired",
            Self::Failed => "failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Validate a status change.
    ///
    /// Returns `Ok(false)` when the record is already in `next` and the call
    /// is a no-op, `Ok(true)` when the status actually changes.
    pub fn transition(self, next: Self) -> Result<bool> {
        match (self, next) {
            (Self::Pending, Self::Pending) => Ok(false),
            (Self::Pending, _) => Ok(true),
            (Self::Paid, Self::Paid) => Ok(false),
            (from, to) => Err(CheckoutError::InvalidTransition { from, to }),
        }
    }

    /// Status as seen by a reader at `now`; nothing revokes expired charges
    pub fn effective(self, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if self == Self::Pending && now >= expires_at {
            Self::Expired
        } else {
            self
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider artifacts attached to a record once the charge exists
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeFields {
    pub transaction_id: String,
    pub copy_paste: String,
    pub qr_code: String,
}

/// Amounts of one purchase attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaymentAmounts {
    amount: Decimal,
    bump_amount: Decimal,
    total: Decimal,
}

impl PaymentAmounts {
    /// Fails when the sum does not fit in a `Decimal`
    pub fn new(amount: Decimal, bump_amount: Decimal) -> Result<Self> {
        let total = amount.checked_add(bump_amount).ok_or_else(|| {
            CheckoutError::InvalidRequest(format!("total of {amount} + {bump_amount} overflows"))
        })?;
        Ok(Self {
            amount,
            bump_amount,
            total,
        })
    }

    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    pub const fn bump_amount(&self) -> Decimal {
        self.bump_amount
    }

    pub const fn total(&self) -> Decimal {
        self.total
    }
}

/// Payment row before the store assigns it
#[derive(Clone, Debug)]
pub struct NewPayment {
    pub checkout_id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_data: serde_json::Value,
    pub amounts: PaymentAmounts,
    pub expires_at: DateTime<Utc>,
}

/// One purchase attempt
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub checkout_id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_data: serde_json::Value,
    pub amount: Decimal,
    pub bump_amount: Decimal,
    pub total_amount: Decimal,
    pub status: PaymentStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub charge: Option<ChargeFields>,
}

impl Payment {
    /// Materialize a row in `pending` status with no charge fields
    pub fn create(new: NewPayment) -> Self {
        Self {
            id: Uuid::new_v4(),
            checkout_id: new.checkout_id,
            customer_name: new.customer_name,
            customer_email: new.customer_email,
            customer_data: new.customer_data,
            amount: new.amounts.amount(),
            bump_amount: new.amounts.bump_amount(),
            total_amount: new.amounts.total(),
            status: PaymentStatus::Pending,
            expires_at: new.expires_at,
            created_at: Utc::now(),
            paid_at: None,
            charge: None,
        }
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.charge.as_ref().map(|c| c.transaction_id.as_str())
    }

    pub fn effective_status(&self, now: DateTime<Utc>) -> PaymentStatus {
        self.status.effective(self.expires_at, now)
    }
}

/// Payment joined with the producer owning its checkout
#[derive(Clone, Debug)]
pub struct PaymentRecord {
    pub payment: Payment,
    pub producer_id: Option<Uuid>,
}

/// Upsell charge row before the store assigns it
#[derive(Clone, Debug)]
pub struct NewUpsellPayment {
    pub payment_id: Uuid,
    pub upsell_id: Uuid,
    pub amount: Decimal,
    pub charge: ChargeFields,
    pub expires_at: DateTime<Utc>,
}

/// Charge attempt for an upsell tied to a payment
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpsellPayment {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub upsell_id: Uuid,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub charge: ChargeFields,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl UpsellPayment {
    pub fn create(new: NewUpsellPayment) -> Self {
        Self {
            id: Uuid::new_v4(),
            payment_id: new.payment_id,
            upsell_id: new.upsell_id,
            amount: new.amount,
            status: PaymentStatus::Pending,
            charge: new.charge,
            expires_at: new.expires_at,
            created_at: Utc::now(),
            paid_at: None,
        }
    }

    pub fn effective_status(&self, now: DateTime<Utc>) -> PaymentStatus {
        self.status.effective(self.expires_at, now)
    }
}

/// Default lifetime of a Pix charge
pub const CHARGE_TTL_SECS: u32 = 3600;

/// `now + CHARGE_TTL_SECS`
pub fn default_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::seconds(i64::from(CHARGE_TTL_SECS))
}
