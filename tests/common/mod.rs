use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::MockServer;

use iyzico_gateway::{app_router, config::GatewayConfig, AppState};

pub const TEST_API_KEY: &str = "sandbox-test-api-key";
pub const TEST_SECRET_KEY: &str = "sandbox-test-secret-key";

/// Test harness: the full application router pointed at a wiremock gateway.
pub struct TestApp {
    router: Router,
    pub state: Arc<AppState>,
    pub gateway: MockServer,
}

impl TestApp {
    pub async fn new() -> Self {
        let gateway = MockServer::start().await;
        let cfg = GatewayConfig {
            api_key: TEST_API_KEY.to_string(),
            secret_key: TEST_SECRET_KEY.to_string(),
            environment: "sandbox".to_string(),
            public_base_url: "https://shop.test".to_string(),
            api_base_url: Some(gateway.uri()),
            host: "127.0.0.1".to_string(),
            port: 0,
            enable_installments: true,
            max_installments: 12,
            force_3ds: true,
            log_level: "debug".to_string(),
            log_json: false,
        };
        let state = Arc::new(AppState::new(cfg).expect("app state"));
        let router = app_router(state.clone());
        Self {
            router,
            state,
            gateway,
        }
    }

    pub async fn post_json(&self, path: &str, payload: Value) -> Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri(path)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(payload.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response")
    }

    pub async fn post_form(&self, path: &str, form: &str) -> Response {
        self.post_form_with_headers(path, form, &[]).await
    }

    pub async fn post_form_with_headers(
        &self,
        path: &str,
        form: &str,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.router
            .clone()
            .oneshot(builder.body(Body::from(form.to_string())).expect("request"))
            .await
            .expect("response")
    }

    pub async fn get(&self, path: &str) -> Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri(path)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response")
    }

    /// Default checkout request body used across tests.
    pub fn checkout_payload(reference: &str) -> Value {
        json!({
            "reference": reference,
            "amount": "149.99",
            "currency": "TRY",
            "language": "tr_TR",
            "email": "buyer@example.com",
            "first_name": "Ada",
            "last_name": "Yilmaz",
            "phone": "05551234567",
            "address": "Bagdat Cad. 1",
            "city": "Istanbul",
            "country": "Turkey",
            "customer_ip": "203.0.113.7"
        })
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// `Location` header of a redirect response.
pub fn redirect_location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect has location")
        .to_str()
        .expect("ascii location")
        .to_string()
}
