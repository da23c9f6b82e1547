//! Checkout initiation handler.

use std::sync::Arc;

use axum::{extract::State, response::Json};
use tracing::info;

use crate::checkout::{CheckoutRedirect, CheckoutRequest};
use crate::errors::GatewayError;
use crate::AppState;

/// Open (or reuse) a hosted checkout session for an order and return the
/// redirect the shopper's browser should follow.
pub async fn create_checkout(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutRedirect>, GatewayError> {
    let redirect = state.checkout.get_or_create_session(&request).await?;

    if !redirect.reused {
        state.transactions.record_session(
            &request.reference,
            request.amount,
            &request.currency,
            &redirect.token,
        );
    }

    info!(
        reference = %request.reference,
        reused = redirect.reused,
        "checkout redirect issued"
    );
    Ok(Json(redirect))
}
