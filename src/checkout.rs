//! Hosted checkout sessions: init payload construction, token caching with
//! expiry-aware reuse, and redirect form rendering.

use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};
use url::Url;
use validator::Validate;

use crate::client::{CheckoutSession, IyzicoClient};
use crate::config::GatewayConfig;
use crate::consts;
use crate::errors::GatewayError;
use crate::format;

/// The gateway requires a national identity number for the buyer block; the
/// reference integration sends this placeholder when none is collected.
const PLACEHOLDER_IDENTITY: &str = "11111111111";
const PLACEHOLDER_TEXT: &str = "Not provided";
const DEFAULT_COUNTRY: &str = "Turkey";
const DEFAULT_IP: &str = "127.0.0.1";

/// Host-side order data used to open a hosted checkout session.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CheckoutRequest {
    /// Host transaction reference; doubles as conversationId and basketId
    #[validate(length(min = 1))]
    pub reference: String,
    pub amount: Decimal,
    #[validate(length(min = 3, max = 3))]
    pub currency: String,
    /// Host language tag, e.g. "tr_TR"
    #[serde(default)]
    pub language: String,
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub customer_ip: String,
}

fn non_empty<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

/// Build the checkout form init payload. Missing buyer details get the same
/// placeholders the gateway's own plugins send, since the buyer block is
/// mandatory even for digital goods.
pub fn build_init_payload(config: &GatewayConfig, request: &CheckoutRequest) -> Value {
    let locale = format::resolve_locale(&request.language);
    let price = format::format_amount(request.amount, &request.currency);

    let first_name = non_empty(&request.first_name, "Guest");
    let last_name = non_empty(&request.last_name, PLACEHOLDER_TEXT);
    let contact_name = format!("{} {}", first_name, last_name);
    let address = non_empty(&request.address, PLACEHOLDER_TEXT);
    let city = non_empty(&request.city, PLACEHOLDER_TEXT);
    let country = non_empty(&request.country, DEFAULT_COUNTRY);
    let ip = non_empty(&request.customer_ip, DEFAULT_IP);

    json!({
        "locale": locale,
        "conversationId": request.reference,
        "price": price,
        "paidPrice": price,
        "currency": request.currency,
        "basketId": request.reference,
        "paymentGroup": consts::PAYMENT_GROUP,
        "callbackUrl": config.callback_url(),
        "enabledInstallments": config.enabled_installments(),
        "forceThreeDS": if config.force_3ds { "1" } else { "0" },
        "buyer": {
            "id": request.reference,
            "name": first_name,
            "surname": last_name,
            "gsmNumber": format::format_phone(&request.phone),
            "email": request.email,
            "identityNumber": PLACEHOLDER_IDENTITY,
            "registrationAddress": address,
            "ip": ip,
            "city": city,
            "country": country,
        },
        "shippingAddress": {
            "contactName": contact_name,
            "city": city,
            "country": country,
            "address": address,
        },
        "billingAddress": {
            "contactName": contact_name,
            "city": city,
            "country": country,
            "address": address,
        },
        "basketItems": [{
            "id": request.reference,
            "name": format!("Order {}", request.reference),
            "category1": "General",
            "itemType": "VIRTUAL",
            "price": price,
        }],
    })
}

/// Redirect rendered for the shopper: a form POST target plus hidden fields
/// carrying the page's query parameters verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutRedirect {
    pub token: String,
    /// Form action, the payment page URL stripped of its query string
    pub api_url: String,
    /// Query parameters of the payment page URL, order preserved
    pub url_params: Vec<(String, String)>,
    /// True when a cached, still-valid session was reused
    pub reused: bool,
}

/// Split a payment page URL into form action and hidden fields. The gateway
/// signs those query parameters, so they must be passed through unmodified.
pub fn redirect_form(payment_page_url: &str) -> Result<(String, Vec<(String, String)>), GatewayError> {
    let url = Url::parse(payment_page_url)
        .map_err(|e| GatewayError::Protocol(format!("invalid payment page URL: {}", e)))?;
    let params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let mut action = url.clone();
    action.set_query(None);
    action.set_fragment(None);
    Ok((action.to_string(), params))
}

/// Caches checkout sessions per host reference and reuses a token while its
/// expiry is comfortably in the future.
///
/// Intentionally lock-free beyond the map's own sharding: two concurrent
/// inits for the same reference may both reach the gateway and the second
/// write wins. Both tokens stay valid gateway-side, so the worst case is one
/// redundant session.
pub struct CheckoutService {
    config: Arc<GatewayConfig>,
    client: Arc<IyzicoClient>,
    sessions: DashMap<String, CheckoutSession>,
}

impl CheckoutService {
    pub fn new(config: Arc<GatewayConfig>, client: Arc<IyzicoClient>) -> Self {
        Self {
            config,
            client,
            sessions: DashMap::new(),
        }
    }

    /// Return a redirect for the given order, reusing the cached session
    /// when its token expires more than the reuse margin from now. Reuse
    /// never touches the network; the redirect URL is reconstructed from the
    /// checkout base URL and the cached token.
    pub async fn get_or_create_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutRedirect, GatewayError> {
        request.validate()?;

        if let Some(session) = self.sessions.get(&request.reference) {
            if session.is_reusable() {
                debug!(reference = %request.reference, "reusing cached checkout session");
                let locale = format::resolve_locale(&request.language);
                let url = format!(
                    "{}?token={}&lang={}",
                    self.config.checkout_url(),
                    session.token,
                    locale
                );
                let (api_url, url_params) = redirect_form(&url)?;
                return Ok(CheckoutRedirect {
                    token: session.token.clone(),
                    api_url,
                    url_params,
                    reused: true,
                });
            }
        }

        let payload = build_init_payload(&self.config, request);
        let session = self.client.initialize_checkout(payload).await?;
        info!(reference = %request.reference, "new checkout session opened");

        let (api_url, url_params) = redirect_form(&session.payment_page_url)?;
        let redirect = CheckoutRedirect {
            token: session.token.clone(),
            api_url,
            url_params,
            reused: false,
        };
        // Last write wins under concurrent inits for the same reference.
        self.sessions.insert(request.reference.clone(), session);
        Ok(redirect)
    }

    /// Cached session for a reference, if any (valid or not).
    pub fn session(&self, reference: &str) -> Option<CheckoutSession> {
        self.sessions.get(reference).map(|s| s.clone())
    }

    /// Drop a cached session once its transaction reaches a final state.
    pub fn invalidate(&self, reference: &str) {
        self.sessions.remove(reference);
    }
}
