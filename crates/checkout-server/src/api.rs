//! Router

use axum::{
    Json, Router, middleware,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{
    ErrorResponse, charge_upsell, get_payment, get_upsell_payment, health_check, pix_webhook,
    preflight, submit_checkout,
};
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health
        .route("/health", get(health_check))

        // Checkout
        .route("/api/checkout/pix", post(submit_checkout))
        .route("/api/upsell/charge", post(charge_upsell))

        // Status
        .route("/api/payments/{id}", get(get_payment))
        .route("/api/upsell-payments/{id}", get(get_upsell_payment))

        // Provider callbacks
        .route("/webhook/pix", post(pix_webhook))

        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(preflight))
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Not found".into(),
        }),
    )
}
