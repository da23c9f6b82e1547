//! Gateway-wide constants: endpoints, status tables and the error-code
//! message map.
//!
//! Everything here is built once at process start and never mutated.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::time::Duration;

// Gateway base URLs
pub const API_URL_SANDBOX: &str = "https://sandbox-api.iyzipay.com";
pub const API_URL_PRODUCTION: &str = "https://api.iyzipay.com";

// Hosted checkout page base URLs (for redirect reconstruction)
pub const CHECKOUT_URL_SANDBOX: &str = "https://sandbox-cpp.iyzipay.com";
pub const CHECKOUT_URL_PRODUCTION: &str = "https://cpp.iyzipay.com";

// API endpoints
pub const ENDPOINT_CHECKOUT_FORM_INIT: &str = "/payment/iyzipos/checkoutform/initialize/auth/ecom";
pub const ENDPOINT_CHECKOUT_FORM_RETRIEVE: &str = "/payment/iyzipos/checkoutform/auth/ecom/detail";
pub const ENDPOINT_REFUND: &str = "/payment/refund";
pub const ENDPOINT_CANCEL: &str = "/payment/cancel";
pub const ENDPOINT_BIN_CHECK: &str = "/payment/bin/check";

/// Scheme token prefixed to every authorization header.
pub const AUTH_SCHEME: &str = "IYZWSv2";

/// Fixed timeout applied to every outbound gateway call.
pub const API_TIMEOUT: Duration = Duration::from_secs(60);

/// Default checkout token lifetime when the gateway omits `tokenExpireTime`.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 1800;

/// A cached checkout token is only reused while its expiry is at least this
/// far in the future; otherwise a fresh session is created.
pub const TOKEN_REUSE_MARGIN_SECS: i64 = 300;

/// Documented test BIN used to verify API credentials.
pub const CREDENTIAL_TEST_BIN: &str = "552879";

pub const PAYMENT_GROUP: &str = "PRODUCT";

pub const INSTALLMENT_OPTIONS: &[u32] = &[1, 2, 3, 6, 9, 12];

pub const SUPPORTED_CURRENCIES: &[&str] =
    &["TRY", "EUR", "USD", "GBP", "IRR", "NOK", "RUB", "CHF"];

/// Decimal places per currency for amount formatting. Unlisted currencies
/// default to 2.
pub static CURRENCY_DECIMALS: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    HashMap::from([
        ("TRY", 2),
        ("EUR", 2),
        ("USD", 2),
        ("GBP", 2),
        ("IRR", 0),
        ("NOK", 2),
        ("RUB", 2),
        ("CHF", 2),
    ])
});

pub const DEFAULT_CURRENCY_DECIMALS: u32 = 2;

/// Host language tag to gateway locale code.
pub static LOCALE_MAPPING: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("tr_TR", "tr"),
        ("en_US", "en"),
        ("en_GB", "en"),
        ("ar_001", "en"),
    ])
});

pub const DEFAULT_LOCALE: &str = "tr";

// Payment status sets, compared against the uppercased gateway status.
// Each status string belongs to exactly one set; lookup order is
// done -> error -> pending -> init.
pub const DONE_STATUSES: &[&str] = &["SUCCESS"];
pub const ERROR_STATUSES: &[&str] = &["FAILURE"];
pub const PENDING_STATUSES: &[&str] = &["CALLBACK_THREEDS"];
pub const INIT_STATUSES: &[&str] = &["INIT_THREEDS"];

/// Gateway error codes mapped to operator-facing messages. Codes outside
/// this table fall back to the raw `errorMessage` field.
pub static ERROR_CODES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        // Card-related errors
        ("10005", "İşlem onaylanmadı. Lütfen bankanızla iletişime geçin. (Transaction not approved)"),
        ("10012", "Geçersiz kart numarası. Lütfen kartınızı kontrol edin. (Invalid card number)"),
        ("10034", "Dolandırıcılık şüphesi. Lütfen bankanızla iletişime geçin. (Fraud suspicion)"),
        ("10041", "Kayıp kart. Bu kart kullanılamaz. (Lost card)"),
        ("10043", "Çalıntı kart. Bu kart kullanılamaz. (Stolen card)"),
        ("10051", "Kartınızda yetersiz bakiye bulunmaktadır. (Insufficient funds)"),
        ("10054", "Kartınızın süresi dolmuş. Lütfen başka bir kart kullanın. (Expired card)"),
        ("10057", "Kart sahibi bu işlemi gerçekleştiremez. (Card holder cannot perform this transaction)"),
        ("10058", "Terminal bu işlem için yetkili değil. (Terminal not authorized)"),
        ("10084", "CVC2 bilgisi hatalı. (Invalid CVC2)"),
        // 3D Secure errors
        ("10201", "3D Secure doğrulaması başarısız. (3D Secure authentication failed)"),
        ("10203", "3D Secure doğrulaması tamamlanamadı. (3D Secure not completed)"),
        ("10204", "Kartınız 3D Secure desteklemiyor. (Card does not support 3D Secure)"),
        // Transaction errors
        ("10000", "İşlem sırasında bir hata oluştu. Lütfen tekrar deneyin. (General transaction error)"),
        ("10001", "Geçersiz istek. Lütfen bilgilerinizi kontrol edin. (Invalid request)"),
        ("10002", "API anahtarı geçersiz. (Invalid API key)"),
        ("10003", "İşlem tutarı geçersiz. (Invalid amount)"),
        ("10004", "Para birimi desteklenmiyor. (Unsupported currency)"),
        ("10006", "İşlem limiti aşıldı. (Transaction limit exceeded)"),
        ("10007", "İşlem zaten gerçekleştirilmiş. (Duplicate transaction)"),
        ("10008", "İşlem bulunamadı. (Transaction not found)"),
        ("10009", "İade tutarı işlem tutarını aşıyor. (Refund amount exceeds transaction amount)"),
        ("10010", "İşlem iade edilemez durumda. (Transaction cannot be refunded)"),
        // Merchant/terminal errors
        ("10011", "Üye işyeri bulunamadı. (Merchant not found)"),
        ("10013", "Üye işyeri aktif değil. (Merchant not active)"),
        ("10014", "Geçersiz imza. (Invalid signature)"),
        ("10015", "Geçersiz IP adresi. (Invalid IP address)"),
        // Installment errors
        ("10060", "Taksit sayısı geçersiz. (Invalid installment count)"),
        ("10061", "Kartınız taksit desteklemiyor. (Card does not support installments)"),
        ("10062", "Bu tutar için taksit yapılamaz. (Amount not eligible for installments)"),
        // Timeout errors
        ("10090", "İşlem zaman aşımına uğradı. Lütfen tekrar deneyin. (Transaction timeout)"),
        ("10091", "Banka yanıt vermedi. Lütfen tekrar deneyin. (Bank timeout)"),
        // Refund/cancel errors
        ("10100", "İade işlemi başarısız. (Refund failed)"),
        ("10101", "İptal işlemi başarısız. (Cancel failed)"),
        ("10102", "İade için geç kalındı. (Refund deadline passed)"),
        ("10103", "Kısmi iade yapılamaz. (Partial refund not allowed)"),
        // BIN/card check errors
        ("10120", "Kart bilgileri alınamadı. (Unable to retrieve card info)"),
        ("10121", "Kart BIN numarası geçersiz. (Invalid BIN number)"),
        // General errors
        ("10999", "Bilinmeyen hata. Lütfen tekrar deneyin. (Unknown error)"),
        ("11000", "Sistem hatası. Lütfen daha sonra tekrar deneyin. (System error)"),
    ])
});
