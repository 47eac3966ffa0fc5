//! HTTP Handlers
//!
//! Request bodies are taken raw and parsed here so a malformed body gets
//! the same JSON envelope as any other failure on that route.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use checkout_core::{CheckoutError, Payment, PaymentStatus, UpsellPayment};
use checkout_flow::{SubmissionRequest, UpsellChargeRequest, UpsellChargeResponse};
use pix_payments::{ReconcileOutcome, WebhookHandler};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub environment: &'static str,
    pub provider: String,
    pub simulated_charges: bool,
    pub notifier_configured: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    fn reply(status: StatusCode, error: impl Into<String>) -> Response {
        (status, Json(Self { error: error.into() })).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub results: Vec<ReconcileOutcome>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookQuery {
    pub hmac: Option<String>,
}

/// Public view of a payment, with reader-side expiry applied
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    pub payment_id: Uuid,
    pub checkout_id: Uuid,
    pub status: PaymentStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub bump_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub transaction_id: Option<String>,
    pub copy_paste_string: Option<String>,
    pub qr_code_reference: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl PaymentView {
    fn new(payment: Payment, now: DateTime<Utc>) -> Self {
        let status = payment.effective_status(now);
        let charge = payment.charge;
        Self {
            payment_id: payment.id,
            checkout_id: payment.checkout_id,
            status,
            amount: payment.amount,
            bump_amount: payment.bump_amount,
            total_amount: payment.total_amount,
            transaction_id: charge.as_ref().map(|c| c.transaction_id.clone()),
            copy_paste_string: charge.as_ref().map(|c| c.copy_paste.clone()),
            qr_code_reference: charge.map(|c| c.qr_code),
            expires_at: payment.expires_at,
            created_at: payment.created_at,
            paid_at: payment.paid_at,
        }
    }
}

/// Public view of an upsell payment
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsellPaymentView {
    pub upsell_payment_id: Uuid,
    pub payment_id: Uuid,
    pub upsell_id: Uuid,
    pub status: PaymentStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub transaction_id: String,
    pub copy_paste_string: String,
    pub qr_code_reference: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl UpsellPaymentView {
    fn new(payment: UpsellPayment, now: DateTime<Utc>) -> Self {
        Self {
            upsell_payment_id: payment.id,
            payment_id: payment.payment_id,
            upsell_id: payment.upsell_id,
            status: payment.effective_status(now),
            amount: payment.amount,
            transaction_id: payment.charge.transaction_id,
            copy_paste_string: payment.charge.copy_paste,
            qr_code_reference: payment.charge.qr_code,
            expires_at: payment.expires_at,
            created_at: payment.created_at,
            paid_at: payment.paid_at,
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

const ALLOWED_HEADERS: &str = "authorization, x-client-info, apikey, content-type";
const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";

/// Answer every `OPTIONS` request with an empty 200 and permissive CORS
/// headers. Nothing else runs for it.
pub async fn preflight(request: Request, next: Next) -> Response {
    if request.method() != Method::OPTIONS {
        return next.run(request).await;
    }

    let mut response = StatusCode::OK.into_response();
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOWED_HEADERS));
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOWED_METHODS));
    response
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment.as_str(),
        provider: state.provider.name().to_string(),
        simulated_charges: state.provider.is_simulated(),
        notifier_configured: state.config.is_notifier_configured(),
    })
}

/// Submit a checkout and return its Pix charge
pub async fn submit_checkout(State(state): State<AppState>, body: Bytes) -> Response {
    let request: SubmissionRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("Rejected checkout body: {}", e);
            let error = CheckoutError::InvalidRequest(e.to_string());
            return ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, error.user_message());
        }
    };

    let checkout_id = request.checkout_id;
    match state.submitter.submit(request).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            if e.is_not_found() {
                tracing::warn!(checkout_id = %checkout_id, "Submission for unknown or inactive checkout");
            } else {
                tracing::error!(checkout_id = %checkout_id, error = %e, "Checkout submission failed");
            }
            ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, e.user_message())
        }
    }
}

/// Charge an accepted upsell offer
pub async fn charge_upsell(State(state): State<AppState>, body: Bytes) -> Response {
    let response = match serde_json::from_slice::<UpsellChargeRequest>(&body) {
        Ok(request) => state.upsells.respond(request).await,
        Err(e) => {
            tracing::warn!("Rejected upsell body: {}", e);
            UpsellChargeResponse::from(Err(CheckoutError::InvalidRequest(e.to_string())))
        }
    };

    let status = if response.is_success() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(response)).into_response()
}

/// Pix provider payment notifications
pub async fn pix_webhook(
    State(state): State<AppState>,
    Query(query): Query<WebhookQuery>,
    body: String,
) -> Response {
    let expected = state.config.webhook_secret.as_deref();
    if !WebhookHandler::verify_secret(expected, query.hmac.as_deref()) {
        tracing::warn!("Pix webhook with bad secret");
        return ErrorResponse::reply(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    let notification = match WebhookHandler::parse(&body) {
        Ok(notification) => notification,
        Err(e) => {
            tracing::warn!("Pix webhook parse failed: {}", e);
            return ErrorResponse::reply(StatusCode::BAD_REQUEST, e.user_message());
        }
    };

    match state.webhook.handle(notification).await {
        Ok(results) => Json(WebhookResponse { results }).into_response(),
        Err(e) => {
            tracing::error!("Pix webhook processing error: {}", e);
            ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, "Webhook processing failed")
        }
    }
}

/// Payment status lookup
pub async fn get_payment(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let not_found = || {
        ErrorResponse::reply(
            StatusCode::NOT_FOUND,
            CheckoutError::PaymentNotFound(id.clone()).user_message(),
        )
    };
    let Ok(payment_id) = id.parse::<Uuid>() else {
        return not_found();
    };

    match state.store.find_payment(payment_id).await {
        Ok(Some(record)) => Json(PaymentView::new(record.payment, Utc::now())).into_response(),
        Ok(None) => not_found(),
        Err(e) => {
            tracing::error!(payment_id = %payment_id, error = %e, "Payment lookup failed");
            ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, e.user_message())
        }
    }
}

/// Upsell payment status lookup
pub async fn get_upsell_payment(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let not_found = || {
        ErrorResponse::reply(
            StatusCode::NOT_FOUND,
            CheckoutError::PaymentNotFound(id.clone()).user_message(),
        )
    };
    let Ok(upsell_payment_id) = id.parse::<Uuid>() else {
        return not_found();
    };

    match state.store.find_upsell_payment(upsell_payment_id).await {
        Ok(Some(payment)) => Json(UpsellPaymentView::new(payment, Utc::now())).into_response(),
        Ok(None) => not_found(),
        Err(e) => {
            tracing::error!(upsell_payment_id = %upsell_payment_id, error = %e, "Upsell payment lookup failed");
            ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, e.user_message())
        }
    }
}
