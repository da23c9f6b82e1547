//! Payment-status reconciliation.
//!
//! Maps a gateway response payload to exactly one transaction outcome plus
//! audit metadata. Pure and idempotent: the same response always yields the
//! same classification, and unrecognized statuses are conservatively left
//! pending for manual review rather than failed or dropped.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::consts::{DONE_STATUSES, ERROR_STATUSES, INIT_STATUSES, PENDING_STATUSES};
use crate::errors::GatewayError;

/// A gateway response payload. Every field the gateway may omit is optional;
/// unknown fields are retained in `extra` for logging and audit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub payment_id: Option<String>,
    pub conversation_id: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub token: Option<String>,
    pub token_expire_time: Option<i64>,
    pub payment_page_url: Option<String>,
    pub installment: Option<i64>,
    pub card_family: Option<String>,
    pub card_association: Option<String>,
    pub card_type: Option<String>,
    pub eci: Option<String>,
    pub md_status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GatewayResponse {
    pub fn from_value(value: Value) -> Result<Self, GatewayError> {
        serde_json::from_value(value)
            .map_err(|e| GatewayError::Protocol(format!("unexpected response shape: {}", e)))
    }

    /// True when the gateway reported the request itself as successful.
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }
}

/// The only state the reconciler produces; persisting it into a transaction
/// record is the host's responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionOutcome {
    Done,
    Pending,
    Error,
}

/// Card and 3-D Secure details extracted for audit, passed through
/// unmodified when present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMetadata {
    /// Number of installments; "no installments" is represented as 1.
    pub installment: i64,
    pub card_family: Option<String>,
    pub card_association: Option<String>,
    pub card_type: Option<String>,
    /// Electronic Commerce Indicator, the 3DS authentication level reached.
    pub eci: Option<String>,
    /// Raw 3DS status string as reported by the gateway.
    pub threeds_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub outcome: TransactionOutcome,
    pub reason: Option<String>,
    pub payment_id: Option<String>,
    pub metadata: PaymentMetadata,
}

/// Classify a gateway response into exactly one outcome.
///
/// Status source: `paymentStatus`, falling back to `status`, uppercased
/// (the gateway is observed to emit both cases). Lookup order is done,
/// error, pending, init; anything else is left pending with the raw status
/// embedded in the reason so an operator can find it.
pub fn reconcile(response: &GatewayResponse) -> Reconciliation {
    let raw_status = response
        .payment_status
        .as_deref()
        .or(response.status.as_deref())
        .unwrap_or("");
    let normalized = raw_status.to_uppercase();

    let metadata = extract_metadata(response);
    let payment_id = response.payment_id.clone();

    let (outcome, reason) = if DONE_STATUSES.contains(&normalized.as_str()) {
        (TransactionOutcome::Done, None)
    } else if ERROR_STATUSES.contains(&normalized.as_str()) {
        let message = match &response.error_code {
            Some(code) => error_reason(code, response.error_message.as_deref()),
            None => response
                .error_message
                .clone()
                .unwrap_or_else(|| "Payment failed.".to_string()),
        };
        (TransactionOutcome::Error, Some(message))
    } else if PENDING_STATUSES.contains(&normalized.as_str()) {
        (
            TransactionOutcome::Pending,
            Some("3D Secure authentication in progress.".to_string()),
        )
    } else if INIT_STATUSES.contains(&normalized.as_str()) {
        (
            TransactionOutcome::Pending,
            Some("Payment initialization in progress.".to_string()),
        )
    } else {
        (
            TransactionOutcome::Pending,
            Some(format!(
                "Payment status: {}. Please check the gateway panel.",
                raw_status
            )),
        )
    };

    Reconciliation {
        outcome,
        reason,
        payment_id,
        metadata,
    }
}

fn error_reason(code: &str, raw_message: Option<&str>) -> String {
    crate::consts::ERROR_CODES
        .get(code)
        .map(|m| (*m).to_string())
        .or_else(|| raw_message.map(str::to_string))
        .unwrap_or_else(|| format!("Payment failed with error code: {}", code))
}

fn extract_metadata(response: &GatewayResponse) -> PaymentMetadata {
    // 0 or negative means "no installments", which the gateway models as 1.
    let installment = match response.installment {
        Some(n) if n > 0 => n,
        _ => 1,
    };

    PaymentMetadata {
        installment,
        card_family: response.card_family.clone(),
        card_association: response.card_association.clone(),
        card_type: response.card_type.clone(),
        eci: response.eci.clone(),
        threeds_status: response
            .payment_status
            .as_ref()
            .or(response.status.as_ref())
            .cloned(),
    }
}
