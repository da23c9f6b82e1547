//! HTTP surface: checkout initiation, gateway callbacks, refunds and card
//! lookups, plus a status endpoint the redirect flow lands on.

pub mod callback;
pub mod checkout;
pub mod payments;

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::GatewayError;
use crate::transactions::TransactionRecord;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/payment/iyzico/checkout", post(checkout::create_checkout))
        .route("/payment/iyzico/callback", post(callback::handle_callback))
        .route("/payment/iyzico/return", get(callback::handle_return))
        .route("/payment/iyzico/refund", post(payments::refund))
        .route("/payment/iyzico/bin-check", post(payments::bin_check))
        .route("/payment/iyzico/installments", post(payments::installment_info))
        .route(
            "/payment/iyzico/verify-credentials",
            post(payments::verify_credentials),
        )
        .route("/payment/status", get(status_page))
        .route("/payment/status/:reference", get(transaction_status))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
struct StatusQuery {
    reference: Option<String>,
    error: Option<String>,
}

/// Landing target for the callback redirects. Shows the transaction result
/// when a reference is known, or the error code the callback rejected with.
async fn status_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatusQuery>,
) -> Json<Value> {
    if let Some(error) = query.error {
        return Json(json!({ "status": "error", "error": error }));
    }

    match query
        .reference
        .as_deref()
        .and_then(|r| state.transactions.find_by_reference(r))
    {
        Some(record) => Json(transaction_json(&record)),
        None => Json(json!({ "status": "unknown" })),
    }
}

async fn transaction_status(
    State(state): State<Arc<AppState>>,
    Path(reference): Path<String>,
) -> Result<Json<Value>, GatewayError> {
    let record = state
        .transactions
        .find_by_reference(&reference)
        .ok_or_else(|| GatewayError::NotFound(format!("transaction {}", reference)))?;
    Ok(Json(transaction_json(&record)))
}

fn transaction_json(record: &TransactionRecord) -> Value {
    json!({
        "reference": record.reference,
        "state": record.state,
        "state_reason": record.state_reason,
        "amount": record.amount,
        "currency": record.currency,
        "provider_payment_id": record.provider_payment_id,
        "metadata": record.metadata,
        "updated_at": record.updated_at,
    })
}
