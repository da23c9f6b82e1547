//! End-to-end checkout flow: session creation and reuse, callback
//! reconciliation, and refunds, with the gateway mocked at the HTTP level.

mod common;

use axum::http::StatusCode;
use common::{redirect_location, response_json, TestApp};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

const INIT_PATH: &str = "/payment/iyzipos/checkoutform/initialize/auth/ecom";
const RETRIEVE_PATH: &str = "/payment/iyzipos/checkoutform/auth/ecom/detail";
const REFUND_PATH: &str = "/payment/refund";

fn init_success(gateway_uri: &str, token: &str, ttl: i64) -> Value {
    json!({
        "status": "success",
        "locale": "tr",
        "token": token,
        "tokenExpireTime": ttl,
        "checkoutFormContent": "<div id=\"iyzipay-checkout-form\"></div>",
        "paymentPageUrl": format!("{}/checkout?token={}&lang=tr", gateway_uri, token),
    })
}

fn retrieve_success(payment_id: &str) -> Value {
    json!({
        "status": "success",
        "paymentStatus": "SUCCESS",
        "paymentId": payment_id,
        "installment": 1,
        "cardFamily": "Bonus",
        "cardAssociation": "MASTER_CARD",
        "cardType": "CREDIT_CARD",
        "eci": "05",
    })
}

async fn mount_init(app: &TestApp, token: &str, ttl: i64, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(INIT_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(init_success(&app.gateway.uri(), token, ttl)),
        )
        .expect(expected_calls)
        .mount(&app.gateway)
        .await;
}

#[tokio::test]
async fn checkout_then_callback_marks_transaction_done() {
    let app = TestApp::new().await;
    mount_init(&app, "tok-flow-1", 1800, 1).await;
    Mock::given(method("POST"))
        .and(path(RETRIEVE_PATH))
        .and(body_partial_json(json!({ "token": "tok-flow-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(retrieve_success("987654321")))
        .expect(1)
        .mount(&app.gateway)
        .await;

    let response = app
        .post_json("/payment/iyzico/checkout", TestApp::checkout_payload("SO-1"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["token"], "tok-flow-1");
    assert_eq!(body["reused"], false);
    assert!(body["url_params"]
        .as_array()
        .unwrap()
        .iter()
        .any(|p| p[0] == "token" && p[1] == "tok-flow-1"));

    let callback = app
        .post_form("/payment/iyzico/callback", "token=tok-flow-1")
        .await;
    assert_eq!(callback.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        redirect_location(&callback),
        "/payment/status?reference=SO-1"
    );

    let status = app.get("/payment/status/SO-1").await;
    assert_eq!(status.status(), StatusCode::OK);
    let body = response_json(status).await;
    assert_eq!(body["state"], "done");
    assert_eq!(body["provider_payment_id"], "987654321");
    assert_eq!(body["metadata"]["card_association"], "MASTER_CARD");
    assert_eq!(body["metadata"]["installment"], 1);
}

#[tokio::test]
async fn cached_session_is_reused_without_a_second_init() {
    let app = TestApp::new().await;
    // No tokenExpireTime in the response: the default 1800s lifetime applies.
    // expect(1) fails the test if reuse still hits the gateway.
    Mock::given(method("POST"))
        .and(path(INIT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "token": "tok-reuse",
            "paymentPageUrl": format!("{}/checkout?token=tok-reuse&lang=tr", app.gateway.uri()),
        })))
        .expect(1)
        .mount(&app.gateway)
        .await;

    let first = app
        .post_json("/payment/iyzico/checkout", TestApp::checkout_payload("SO-2"))
        .await;
    let first = response_json(first).await;
    assert_eq!(first["reused"], false);

    let second = app
        .post_json("/payment/iyzico/checkout", TestApp::checkout_payload("SO-2"))
        .await;
    let second = response_json(second).await;
    assert_eq!(second["reused"], true);
    assert_eq!(second["token"], first["token"]);
    // Reuse reconstructs the redirect from the hosted checkout base URL.
    assert_eq!(second["api_url"], "https://sandbox-cpp.iyzipay.com/");
    assert!(second["url_params"]
        .as_array()
        .unwrap()
        .iter()
        .any(|p| p[0] == "lang" && p[1] == "tr"));
}

#[tokio::test]
async fn session_close_to_expiry_gets_a_fresh_init() {
    let app = TestApp::new().await;
    // TTL below the 5-minute reuse margin, so the cached token is stale.
    mount_init(&app, "tok-short", 60, 2).await;

    let first = app
        .post_json("/payment/iyzico/checkout", TestApp::checkout_payload("SO-3"))
        .await;
    assert_eq!(response_json(first).await["reused"], false);

    let second = app
        .post_json("/payment/iyzico/checkout", TestApp::checkout_payload("SO-3"))
        .await;
    assert_eq!(response_json(second).await["reused"], false);
}

#[tokio::test]
async fn callback_without_token_is_rejected_without_gateway_contact() {
    let app = TestApp::new().await;
    Mock::given(method("POST"))
        .and(path(RETRIEVE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(retrieve_success("1")))
        .expect(0)
        .mount(&app.gateway)
        .await;

    let callback = app.post_form("/payment/iyzico/callback", "").await;
    assert_eq!(callback.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        redirect_location(&callback),
        "/payment/status?error=missing_token"
    );

    let empty = app.post_form("/payment/iyzico/callback", "token=").await;
    assert_eq!(
        redirect_location(&empty),
        "/payment/status?error=missing_token"
    );
}

#[tokio::test]
async fn tokenless_return_leg_lands_on_neutral_status_page() {
    let app = TestApp::new().await;

    let response = app.get("/payment/iyzico/return").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(redirect_location(&response), "/payment/status");

    // A token in the query string still goes through reconciliation.
    let with_token = app.get("/payment/iyzico/return?token=tok-ghost").await;
    assert_eq!(
        redirect_location(&with_token),
        "/payment/status?error=transaction_not_found"
    );
}

#[tokio::test]
async fn callback_with_unknown_token_is_rejected() {
    let app = TestApp::new().await;
    let callback = app
        .post_form("/payment/iyzico/callback", "token=tok-ghost")
        .await;
    assert_eq!(
        redirect_location(&callback),
        "/payment/status?error=transaction_not_found"
    );
}

#[tokio::test]
async fn callback_with_bad_signature_is_rejected_before_retrieval() {
    let app = TestApp::new().await;
    mount_init(&app, "tok-sig", 1800, 1).await;
    Mock::given(method("POST"))
        .and(path(RETRIEVE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(retrieve_success("1")))
        .expect(0)
        .mount(&app.gateway)
        .await;

    app.post_json("/payment/iyzico/checkout", TestApp::checkout_payload("SO-4"))
        .await;

    let callback = app
        .post_form_with_headers(
            "/payment/iyzico/callback",
            "token=tok-sig",
            &[("x-iyzico-signature", "deadbeef")],
        )
        .await;
    assert_eq!(
        redirect_location(&callback),
        "/payment/status?error=invalid_signature"
    );
}

#[tokio::test]
async fn callback_with_valid_signature_is_accepted() {
    let app = TestApp::new().await;
    mount_init(&app, "tok-signed", 1800, 1).await;
    Mock::given(method("POST"))
        .and(path(RETRIEVE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(retrieve_success("42")))
        .expect(1)
        .mount(&app.gateway)
        .await;

    app.post_json("/payment/iyzico/checkout", TestApp::checkout_payload("SO-5"))
        .await;

    let mut mac = Hmac::<Sha256>::new_from_slice(common::TEST_SECRET_KEY.as_bytes()).unwrap();
    mac.update(b"tok-signed");
    let signature = hex::encode(mac.finalize().into_bytes());

    let callback = app
        .post_form_with_headers(
            "/payment/iyzico/callback",
            "token=tok-signed",
            &[("x-iyzico-signature", signature.as_str())],
        )
        .await;
    assert_eq!(
        redirect_location(&callback),
        "/payment/status?reference=SO-5"
    );
}

#[tokio::test]
async fn failed_payment_reconciles_to_error_with_resolved_reason() {
    let app = TestApp::new().await;
    mount_init(&app, "tok-fail", 1800, 1).await;
    Mock::given(method("POST"))
        .and(path(RETRIEVE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "paymentStatus": "FAILURE",
            "errorCode": "10051",
            "errorMessage": "raw bank text",
        })))
        .expect(1)
        .mount(&app.gateway)
        .await;

    app.post_json("/payment/iyzico/checkout", TestApp::checkout_payload("SO-6"))
        .await;
    let callback = app
        .post_form("/payment/iyzico/callback", "token=tok-fail")
        .await;
    assert_eq!(
        redirect_location(&callback),
        "/payment/status?reference=SO-6"
    );

    let body = response_json(app.get("/payment/status/SO-6").await).await;
    assert_eq!(body["state"], "error");
    assert!(body["state_reason"]
        .as_str()
        .unwrap()
        .contains("Insufficient funds"));
}

#[tokio::test]
async fn completed_payment_can_be_refunded_by_gateway_payment_id() {
    let app = TestApp::new().await;
    mount_init(&app, "tok-refund", 1800, 1).await;
    Mock::given(method("POST"))
        .and(path(RETRIEVE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(retrieve_success("555000111")))
        .mount(&app.gateway)
        .await;
    Mock::given(method("POST"))
        .and(path(REFUND_PATH))
        .and(body_partial_json(json!({
            "paymentId": "555000111",
            "price": "50.00",
            "currency": "TRY",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "paymentId": "555000111",
        })))
        .expect(1)
        .mount(&app.gateway)
        .await;

    app.post_json("/payment/iyzico/checkout", TestApp::checkout_payload("SO-7"))
        .await;
    app.post_form("/payment/iyzico/callback", "token=tok-refund")
        .await;

    let refund = app
        .post_json(
            "/payment/iyzico/refund",
            json!({ "reference": "SO-7", "amount": "50.00" }),
        )
        .await;
    assert_eq!(refund.status(), StatusCode::OK);
    let body = response_json(refund).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["payment_id"], "555000111");
    assert_eq!(body["amount"], "50.00");
}

#[tokio::test]
async fn refund_validation_rejects_bad_amounts_and_states() {
    let app = TestApp::new().await;
    mount_init(&app, "tok-norefund", 1800, 1).await;

    // Unknown reference
    let missing = app
        .post_json("/payment/iyzico/refund", json!({ "reference": "SO-none" }))
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    // Transaction exists but is not done yet
    app.post_json("/payment/iyzico/checkout", TestApp::checkout_payload("SO-8"))
        .await;
    let not_done = app
        .post_json("/payment/iyzico/refund", json!({ "reference": "SO-8" }))
        .await;
    assert_eq!(not_done.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_page_reports_error_codes() {
    let app = TestApp::new().await;
    let body = response_json(app.get("/payment/status?error=missing_token").await).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"], "missing_token");

    let body = response_json(app.get("/payment/status?reference=SO-none").await).await;
    assert_eq!(body["status"], "unknown");
}
