//! Gateway callback and return handlers.
//!
//! The shopper's browser is redirected here after the hosted payment page.
//! POSTed form fields are never trusted beyond the token: the authoritative
//! result is always re-fetched from the gateway API before any state change.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Redirect,
    Form,
};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::auth;
use crate::reconcile::{reconcile, TransactionOutcome};
use crate::transactions::apply_reconciliation;
use crate::AppState;

const SIGNATURE_HEADER: &str = "x-iyzico-signature";
const STATUS_PATH: &str = "/payment/status";

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub token: Option<String>,
}

/// POST callback from the hosted payment page.
pub async fn handle_callback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(params): Form<CallbackParams>,
) -> Redirect {
    process(state, params.token, &headers).await
}

/// GET return leg; some flows send the shopper back with the token in the
/// query string instead of a form body. This leg is informational: a
/// shopper arriving without a token just lands on the status page.
pub async fn handle_return(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    match params.token.filter(|t| !t.is_empty()) {
        Some(token) => process(state, Some(token), &headers).await,
        None => Redirect::to(STATUS_PATH),
    }
}

async fn process(state: Arc<AppState>, token: Option<String>, headers: &HeaderMap) -> Redirect {
    match reconcile_callback(state, token, headers).await {
        Ok(reference) => Redirect::to(&format!("{}?reference={}", STATUS_PATH, reference)),
        Err(code) => Redirect::to(&format!("{}?error={}", STATUS_PATH, code)),
    }
}

/// Fail-closed callback handling. Every rejection path logs its cause but
/// redirects with an opaque error code only.
async fn reconcile_callback(
    state: Arc<AppState>,
    token: Option<String>,
    headers: &HeaderMap,
) -> Result<String, &'static str> {
    let token = match token.filter(|t| !t.is_empty()) {
        Some(token) => token,
        None => {
            warn!("callback rejected: no token");
            return Err("missing_token");
        }
    };

    // Signature header is optional, but when present it must verify.
    if let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) {
        if !auth::verify_callback_signature(&state.config.secret_key, &token, signature) {
            warn!("callback rejected: signature mismatch");
            return Err("invalid_signature");
        }
    }

    let record = match state.transactions.find_by_token(&token) {
        Some(record) => record,
        None => {
            warn!("callback rejected: token matches no transaction");
            return Err("transaction_not_found");
        }
    };

    let response = state
        .client
        .retrieve_checkout_result(&token)
        .await
        .map_err(|e| {
            error!(reference = %record.reference, error = %e, "checkout result retrieval failed");
            "processing_error"
        })?;

    let reconciliation = reconcile(&response);
    info!(
        reference = %record.reference,
        outcome = ?reconciliation.outcome,
        "callback reconciled"
    );
    apply_reconciliation(state.transactions.as_ref(), &record.reference, &reconciliation);

    if reconciliation.outcome != TransactionOutcome::Pending {
        state.checkout.invalidate(&record.reference);
    }

    Ok(record.reference)
}
