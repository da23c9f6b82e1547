//! IYZWSv2 request signing.
//!
//! The gateway authenticates each request with an HMAC-SHA256 signature over
//! `randomKey + uriPath + requestBody`, keyed by the merchant secret:
//!
//! 1. payload = randomKey + uri_path + request_body
//! 2. signature = hex(HMAC-SHA256(secret_key, payload))
//! 3. auth string = `apiKey:<key>&randomKey:<rnd>&signature:<sig>`
//! 4. header = `IYZWSv2 ` + base64(auth string)
//!
//! Signing is deterministic and has no side effects; uniqueness of the random
//! key per call is the caller's concern.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::consts::AUTH_SCHEME;

type HmacSha256 = Hmac<Sha256>;

/// Build the authorization header for one outbound request.
///
/// `uri_path` must be the exact path the server will see (leading `/`), and
/// `request_body` the exact byte-for-byte string that will be transmitted;
/// any mutation after signing invalidates the signature.
pub fn generate_authorization_header(
    api_key: &str,
    secret_key: &str,
    random_key: &str,
    uri_path: &str,
    request_body: &str,
) -> String {
    let payload = format!("{}{}{}", random_key, uri_path, request_body);

    let mut mac =
        HmacSha256::new_from_slice(secret_key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    let authorization = format!(
        "apiKey:{}&randomKey:{}&signature:{}",
        api_key, random_key, signature
    );

    format!("{} {}", AUTH_SCHEME, BASE64.encode(authorization))
}

/// Fresh 16-character random key for one request, also sent as `x-iyzi-rnd`
/// and used as the default `conversationId`.
pub fn random_key() -> String {
    let mut key = Uuid::new_v4().simple().to_string();
    key.truncate(16);
    key
}

/// Constant-time comparison of the optional callback signature header
/// against HMAC-SHA256(secret_key, token).
pub fn verify_callback_signature(secret_key: &str, token: &str, signature_header: &str) -> bool {
    let mut mac =
        HmacSha256::new_from_slice(secret_key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(token.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());
    constant_time_eq(&expected, signature_header)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}
