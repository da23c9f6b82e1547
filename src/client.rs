//! Authenticated HTTP client for the gateway REST API.
//!
//! Every call is stateless: a fresh random key is generated, the canonical
//! JSON body is signed, and the response is classified into the transport /
//! protocol / business error taxonomy. Payloads are redacted before logging.

use std::sync::Arc;

use chrono::{Duration, Utc};
use http::header;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use crate::auth;
use crate::config::GatewayConfig;
use crate::consts;
use crate::errors::GatewayError;
use crate::format;
use crate::reconcile::GatewayResponse;
use crate::redact::redact_payload;

/// A hosted checkout session as returned by the init endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Opaque token identifying the hosted payment page
    pub token: String,
    /// Absolute expiry computed from the gateway's `tokenExpireTime`
    pub expires_at: chrono::DateTime<Utc>,
    /// Redirect URL; its query parameters must be preserved verbatim
    pub payment_page_url: String,
}

impl CheckoutSession {
    /// True while the token can still be reused safely, i.e. its expiry is
    /// more than the fixed margin in the future.
    pub fn is_reusable(&self) -> bool {
        self.expires_at > Utc::now() + Duration::seconds(consts::TOKEN_REUSE_MARGIN_SECS)
    }
}

/// Card details from a BIN lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardInfo {
    pub bin_number: Option<String>,
    pub card_type: Option<String>,
    pub card_association: Option<String>,
    pub card_family: Option<String>,
    pub bank_name: Option<String>,
    pub bank_code: Option<i64>,
    #[serde(default)]
    pub commercial: Option<i64>,
}

impl CardInfo {
    pub fn is_debit(&self) -> bool {
        self.card_type.as_deref() == Some("DEBIT_CARD")
    }
}

/// One installment plan offered for a card.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentOption {
    pub count: u32,
    pub total_price: String,
}

/// BIN lookup combined with the installment plans available for that card.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentInfo {
    #[serde(flatten)]
    pub card: CardInfo,
    pub installment_support: bool,
    pub installments: Vec<InstallmentOption>,
}

pub struct IyzicoClient {
    config: Arc<GatewayConfig>,
    http: reqwest::Client,
}

impl IyzicoClient {
    /// Fails fast when credentials are absent; no network call is ever made
    /// with empty keys.
    pub fn new(config: Arc<GatewayConfig>) -> Result<Self, GatewayError> {
        if config.api_key.is_empty() || config.secret_key.is_empty() {
            return Err(GatewayError::Configuration(
                "gateway API credentials are not configured".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(consts::API_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Internal(e.into()))?;
        Ok(Self { config, http })
    }

    /// POST a signed request and return the parsed JSON body without judging
    /// the gateway-level `status` field.
    #[instrument(skip(self, payload), fields(endpoint = endpoint))]
    async fn call(&self, endpoint: &str, mut payload: Value) -> Result<Value, GatewayError> {
        let random_key = auth::random_key();

        // The gateway requires a conversationId on every request; default it
        // to the random key like the reference integration does.
        if let Some(obj) = payload.as_object_mut() {
            obj.entry("conversationId")
                .or_insert_with(|| Value::String(random_key.clone()));
        }

        let body = serde_json::to_string(&payload)
            .map_err(|e| GatewayError::Internal(anyhow::anyhow!("serialize payload: {}", e)))?;
        let uri_path = format!("/{}", endpoint.trim_start_matches('/'));
        let url = format!("{}{}", self.config.api_url(), uri_path);

        let authorization = auth::generate_authorization_header(
            &self.config.api_key,
            &self.config.secret_key,
            &random_key,
            &uri_path,
            &body,
        );

        debug!(payload = %redact_payload(&payload), "gateway request");

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, authorization)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json")
            .header("x-iyzi-rnd", &random_key)
            .body(body)
            .send()
            .await
            .map_err(GatewayError::from_transport)?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(GatewayError::from_transport)?;
        let value: Value = serde_json::from_str(&text).map_err(|e| {
            warn!(%status, body = %text, "non-JSON gateway response");
            GatewayError::Protocol(format!("invalid JSON from gateway: {}", e))
        })?;

        debug!(response = %redact_payload(&value), "gateway response");
        Ok(value)
    }

    /// Like `call`, but a gateway-reported failure becomes a business error
    /// with its code resolved through the message table.
    async fn request(&self, endpoint: &str, payload: Value) -> Result<Value, GatewayError> {
        let value = self.call(endpoint, payload).await?;
        if value.get("status").and_then(Value::as_str) != Some("success") {
            let code = value
                .get("errorCode")
                .and_then(Value::as_str)
                .map(str::to_string);
            let message = value
                .get("errorMessage")
                .and_then(Value::as_str)
                .map(str::to_string);
            warn!(?code, ?message, endpoint, "gateway reported failure");
            return Err(GatewayError::business(code, message));
        }
        Ok(value)
    }

    /// Initialize a hosted checkout session from a prepared init payload.
    pub async fn initialize_checkout(&self, payload: Value) -> Result<CheckoutSession, GatewayError> {
        let value = self
            .request(consts::ENDPOINT_CHECKOUT_FORM_INIT, payload)
            .await?;

        let token = value
            .get("token")
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::Protocol("checkout init response missing token".into()))?
            .to_string();
        let payment_page_url = value
            .get("paymentPageUrl")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                GatewayError::Protocol("checkout init response missing paymentPageUrl".into())
            })?
            .to_string();
        let ttl = value
            .get("tokenExpireTime")
            .and_then(Value::as_i64)
            .unwrap_or(consts::DEFAULT_TOKEN_TTL_SECS);

        let session = CheckoutSession {
            token,
            expires_at: Utc::now() + Duration::seconds(ttl),
            payment_page_url,
        };
        info!(expires_at = %session.expires_at, "checkout session created");
        Ok(session)
    }

    /// Retrieve the authoritative payment result for a checkout token.
    ///
    /// A gateway-reported payment failure is a reconcilable outcome here,
    /// not a call failure, so the raw parsed response is returned.
    pub async fn retrieve_checkout_result(
        &self,
        token: &str,
    ) -> Result<GatewayResponse, GatewayError> {
        let payload = json!({
            "locale": consts::DEFAULT_LOCALE,
            "token": token,
        });
        let value = self
            .call(consts::ENDPOINT_CHECKOUT_FORM_RETRIEVE, payload)
            .await?;
        GatewayResponse::from_value(value)
    }

    /// Refund a captured payment. The gateway refunds by its own
    /// `paymentId`, never by the host transaction reference.
    pub async fn refund(
        &self,
        payment_id: &str,
        amount: Decimal,
        currency: &str,
    ) -> Result<GatewayResponse, GatewayError> {
        let payload = json!({
            "locale": consts::DEFAULT_LOCALE,
            "paymentId": payment_id,
            "price": format::format_amount(amount, currency),
            "currency": currency,
            "ip": "127.0.0.1",
        });
        let value = self.request(consts::ENDPOINT_REFUND, payload).await?;
        GatewayResponse::from_value(value)
    }

    /// Look up issuing bank and card details for a 6-digit BIN.
    pub async fn bin_check(&self, bin_number: &str) -> Result<CardInfo, GatewayError> {
        if bin_number.len() != 6 || !bin_number.chars().all(|c| c.is_ascii_digit()) {
            return Err(GatewayError::Validation(format!(
                "BIN number must be exactly 6 digits. Provided: {}",
                bin_number
            )));
        }

        let payload = json!({
            "locale": consts::DEFAULT_LOCALE,
            "binNumber": bin_number,
        });
        let value = self.request(consts::ENDPOINT_BIN_CHECK, payload).await?;
        serde_json::from_value(value)
            .map_err(|e| GatewayError::Protocol(format!("unexpected BIN response shape: {}", e)))
    }

    /// BIN lookup plus the installment plans available for that card.
    /// Debit cards get single payment only.
    pub async fn installment_info(
        &self,
        bin_number: &str,
        price: Decimal,
        currency: &str,
    ) -> Result<InstallmentInfo, GatewayError> {
        let card = self.bin_check(bin_number).await?;
        let total_price = format::format_amount(price, currency);

        let (support, counts): (bool, &[u32]) = if card.is_debit() {
            (false, &[1])
        } else {
            (true, consts::INSTALLMENT_OPTIONS)
        };

        Ok(InstallmentInfo {
            card,
            installment_support: support,
            installments: counts
                .iter()
                .map(|count| InstallmentOption {
                    count: *count,
                    total_price: total_price.clone(),
                })
                .collect(),
        })
    }

    /// Verify the configured credentials with a BIN check against the
    /// documented test BIN. Fails with the usual taxonomy on bad keys.
    pub async fn verify_credentials(&self) -> Result<CardInfo, GatewayError> {
        let card = self.bin_check(consts::CREDENTIAL_TEST_BIN).await?;
        info!(
            bank = card.bank_name.as_deref().unwrap_or("unknown"),
            "gateway credentials verified"
        );
        Ok(card)
    }
}
