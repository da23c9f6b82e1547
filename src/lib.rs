//! iyzico payment gateway adapter.
//!
//! Signs requests with the IYZWSv2 scheme, opens hosted checkout sessions,
//! reconciles callback results against the authoritative API response, and
//! exposes refunds and BIN lookups. Transaction persistence stays behind the
//! [`transactions::TransactionLifecycle`] seam so a host system can plug in
//! its own storage.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod checkout;
pub mod client;
pub mod config;
pub mod consts;
pub mod errors;
pub mod format;
pub mod handlers;
pub mod reconcile;
pub mod redact;
pub mod transactions;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::checkout::CheckoutService;
use crate::client::IyzicoClient;
use crate::config::GatewayConfig;
use crate::errors::GatewayError;
use crate::transactions::{InMemoryTransactions, TransactionLifecycle};

/// Shared state behind every handler.
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub client: Arc<IyzicoClient>,
    pub checkout: CheckoutService,
    pub transactions: Arc<dyn TransactionLifecycle>,
}

impl AppState {
    /// Build the full service graph from configuration. Fails fast when
    /// credentials are missing.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let config = Arc::new(config);
        let client = Arc::new(IyzicoClient::new(config.clone())?);
        let checkout = CheckoutService::new(config.clone(), client.clone());
        Ok(Self {
            config,
            client,
            checkout,
            transactions: Arc::new(InMemoryTransactions::new()),
        })
    }

    /// Swap in a host-provided transaction store.
    pub fn with_transactions(mut self, transactions: Arc<dyn TransactionLifecycle>) -> Self {
        self.transactions = transactions;
        self
    }
}

/// Assemble the HTTP application.
pub fn app_router(state: Arc<AppState>) -> Router {
    handlers::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
