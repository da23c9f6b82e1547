//! Refund, BIN lookup and credential verification handlers.

use std::sync::Arc;

use axum::{extract::State, response::Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::{CardInfo, InstallmentInfo};
use crate::errors::GatewayError;
use crate::format;
use crate::transactions::TransactionState;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    pub reference: String,
    /// Defaults to a full refund when omitted
    pub amount: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct RefundResponse {
    pub reference: String,
    pub payment_id: String,
    pub amount: String,
    pub currency: String,
    pub status: &'static str,
}

/// Refund a completed payment through the gateway's own payment id.
pub async fn refund(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RefundRequest>,
) -> Result<Json<RefundResponse>, GatewayError> {
    let record = state
        .transactions
        .find_by_reference(&request.reference)
        .ok_or_else(|| GatewayError::NotFound(format!("transaction {}", request.reference)))?;

    if record.state != TransactionState::Done {
        return Err(GatewayError::Validation(
            "only completed payments can be refunded".to_string(),
        ));
    }
    let payment_id = record.provider_payment_id.clone().ok_or_else(|| {
        GatewayError::Validation("transaction has no gateway payment id".to_string())
    })?;

    let amount = request.amount.unwrap_or(record.amount);
    if amount <= Decimal::ZERO || amount > record.amount {
        return Err(GatewayError::Validation(format!(
            "refund amount must be positive and at most {}",
            record.amount
        )));
    }

    state
        .client
        .refund(&payment_id, amount, &record.currency)
        .await?;

    info!(reference = %record.reference, "refund accepted by gateway");
    Ok(Json(RefundResponse {
        reference: record.reference,
        payment_id,
        amount: format::format_amount(amount, &record.currency),
        currency: record.currency,
        status: "success",
    }))
}

#[derive(Debug, Deserialize)]
pub struct BinCheckRequest {
    pub bin_number: String,
}

pub async fn bin_check(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BinCheckRequest>,
) -> Result<Json<CardInfo>, GatewayError> {
    let card = state.client.bin_check(&request.bin_number).await?;
    Ok(Json(card))
}

#[derive(Debug, Deserialize)]
pub struct InstallmentRequest {
    pub bin_number: String,
    pub price: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "TRY".to_string()
}

pub async fn installment_info(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InstallmentRequest>,
) -> Result<Json<InstallmentInfo>, GatewayError> {
    let info = state
        .client
        .installment_info(&request.bin_number, request.price, &request.currency)
        .await?;
    Ok(Json(info))
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub verified: bool,
    pub bank_name: Option<String>,
}

/// Round-trip the configured credentials against the gateway.
pub async fn verify_credentials(
    State(state): State<Arc<AppState>>,
) -> Result<Json<VerifyResponse>, GatewayError> {
    let card = state.client.verify_credentials().await?;
    Ok(Json(VerifyResponse {
        verified: true,
        bank_name: card.bank_name,
    }))
}
