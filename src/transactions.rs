//! Transaction lifecycle seam.
//!
//! The reconciler only classifies; persisting the outcome belongs to the
//! host system. `TransactionLifecycle` is that boundary, with an in-memory
//! implementation used by the standalone server and the test suite.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::reconcile::{PaymentMetadata, Reconciliation, TransactionOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionState {
    Draft,
    Pending,
    Done,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub reference: String,
    pub amount: Decimal,
    pub currency: String,
    pub state: TransactionState,
    /// Operator-facing reason for the current state, when not done
    pub state_reason: Option<String>,
    /// Gateway-side payment identifier, set when the payment completes.
    /// Refunds go through this id, never through the host reference.
    pub provider_payment_id: Option<String>,
    pub checkout_token: Option<String>,
    pub metadata: Option<PaymentMetadata>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// State transitions the payment flow needs from the host. Done is final:
/// later pending or error signals for the same transaction are ignored.
pub trait TransactionLifecycle: Send + Sync {
    fn find_by_reference(&self, reference: &str) -> Option<TransactionRecord>;
    fn find_by_token(&self, token: &str) -> Option<TransactionRecord>;

    /// Register a new transaction bound to a checkout token.
    fn record_session(&self, reference: &str, amount: Decimal, currency: &str, token: &str);

    fn set_pending(&self, reference: &str, reason: Option<String>);
    fn set_done(&self, reference: &str, payment_id: Option<String>, metadata: PaymentMetadata);
    fn set_error(&self, reference: &str, reason: String);
}

/// Apply a reconciliation to the transaction it belongs to.
pub fn apply_reconciliation(
    lifecycle: &dyn TransactionLifecycle,
    reference: &str,
    reconciliation: &Reconciliation,
) {
    match reconciliation.outcome {
        TransactionOutcome::Done => lifecycle.set_done(
            reference,
            reconciliation.payment_id.clone(),
            reconciliation.metadata.clone(),
        ),
        TransactionOutcome::Pending => {
            lifecycle.set_pending(reference, reconciliation.reason.clone())
        }
        TransactionOutcome::Error => lifecycle.set_error(
            reference,
            reconciliation
                .reason
                .clone()
                .unwrap_or_else(|| "Payment failed.".to_string()),
        ),
    }
}

/// Concurrent in-memory store keyed by reference, with a secondary index
/// from checkout token to reference for callback lookups.
#[derive(Default)]
pub struct InMemoryTransactions {
    by_reference: DashMap<String, TransactionRecord>,
    token_index: DashMap<String, String>,
}

impl InMemoryTransactions {
    pub fn new() -> Self {
        Self::default()
    }

    fn update<F>(&self, reference: &str, apply: F)
    where
        F: FnOnce(&mut TransactionRecord),
    {
        match self.by_reference.get_mut(reference) {
            Some(mut record) => {
                if record.state == TransactionState::Done {
                    warn!(reference, "ignoring state change on completed transaction");
                    return;
                }
                apply(&mut record);
                record.updated_at = Utc::now();
            }
            None => warn!(reference, "state change for unknown transaction"),
        }
    }
}

impl TransactionLifecycle for InMemoryTransactions {
    fn find_by_reference(&self, reference: &str) -> Option<TransactionRecord> {
        self.by_reference.get(reference).map(|r| r.clone())
    }

    fn find_by_token(&self, token: &str) -> Option<TransactionRecord> {
        let reference = self.token_index.get(token)?.clone();
        self.find_by_reference(&reference)
    }

    fn record_session(&self, reference: &str, amount: Decimal, currency: &str, token: &str) {
        let now = Utc::now();
        let record = TransactionRecord {
            reference: reference.to_string(),
            amount,
            currency: currency.to_string(),
            state: TransactionState::Draft,
            state_reason: None,
            provider_payment_id: None,
            checkout_token: Some(token.to_string()),
            metadata: None,
            created_at: now,
            updated_at: now,
        };
        self.token_index
            .insert(token.to_string(), reference.to_string());
        self.by_reference.insert(reference.to_string(), record);
        info!(reference, "transaction recorded for checkout session");
    }

    fn set_pending(&self, reference: &str, reason: Option<String>) {
        self.update(reference, |record| {
            record.state = TransactionState::Pending;
            record.state_reason = reason;
        });
    }

    fn set_done(&self, reference: &str, payment_id: Option<String>, metadata: PaymentMetadata) {
        self.update(reference, |record| {
            record.state = TransactionState::Done;
            record.state_reason = None;
            record.provider_payment_id = payment_id;
            record.metadata = Some(metadata);
        });
        info!(reference, "transaction completed");
    }

    fn set_error(&self, reference: &str, reason: String) {
        self.update(reference, |record| {
            record.state = TransactionState::Error;
            record.state_reason = Some(reason);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn store_with_tx() -> InMemoryTransactions {
        let store = InMemoryTransactions::new();
        store.record_session("SO-1", dec!(100), "TRY", "tok-1");
        store
    }

    #[test]
    fn record_and_lookup_by_token() {
        let store = store_with_tx();
        let record = store.find_by_token("tok-1").expect("indexed by token");
        assert_eq!(record.reference, "SO-1");
        assert_eq!(record.state, TransactionState::Draft);
        assert!(store.find_by_token("tok-unknown").is_none());
    }

    #[test]
    fn pending_then_done_keeps_payment_id() {
        let store = store_with_tx();
        store.set_pending("SO-1", Some("3D Secure authentication in progress.".into()));
        store.set_done("SO-1", Some("987".into()), PaymentMetadata::default());

        let record = store.find_by_reference("SO-1").unwrap();
        assert_eq!(record.state, TransactionState::Done);
        assert_eq!(record.provider_payment_id.as_deref(), Some("987"));
        assert!(record.state_reason.is_none());
    }

    #[test]
    fn done_is_final() {
        let store = store_with_tx();
        store.set_done("SO-1", Some("987".into()), PaymentMetadata::default());
        store.set_error("SO-1", "late failure signal".into());

        let record = store.find_by_reference("SO-1").unwrap();
        assert_eq!(record.state, TransactionState::Done);
        assert_eq!(record.provider_payment_id.as_deref(), Some("987"));
    }

    #[test]
    fn unknown_reference_is_a_noop() {
        let store = InMemoryTransactions::new();
        store.set_error("nope", "whatever".into());
        assert!(store.find_by_reference("nope").is_none());
    }

    #[test]
    fn apply_reconciliation_routes_outcomes() {
        use crate::reconcile::{reconcile, GatewayResponse};
        use serde_json::json;

        let store = store_with_tx();
        let response = GatewayResponse::from_value(json!({
            "paymentStatus": "SUCCESS",
            "paymentId": "555",
        }))
        .unwrap();
        apply_reconciliation(&store, "SO-1", &reconcile(&response));

        let record = store.find_by_reference("SO-1").unwrap();
        assert_eq!(record.state, TransactionState::Done);
        assert_eq!(record.provider_payment_id.as_deref(), Some("555"));
    }
}
