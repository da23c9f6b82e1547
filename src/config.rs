use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

use crate::consts;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "sandbox";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_MAX_INSTALLMENTS: u32 = 12;

/// Gateway adapter configuration with validation.
///
/// Credentials are opaque secrets: they are validated for presence here and
/// must never be logged in plaintext (see `redact`).
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Merchant API key from the gateway panel
    #[validate(length(min = 1))]
    pub api_key: String,

    /// Merchant secret key from the gateway panel
    #[validate(length(min = 1))]
    pub secret_key: String,

    /// "sandbox" or "production"; selects API and checkout base URLs
    #[serde(default = "default_environment")]
    #[validate(custom = "validate_environment")]
    pub environment: String,

    /// Public base URL of this service, used to build the callback URL
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Override for the gateway API base URL (tests point this at a mock)
    #[serde(default)]
    pub api_base_url: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Offer installments on the hosted page
    #[serde(default = "default_true")]
    pub enable_installments: bool,

    /// Cap on offered installment counts (1, 3, 6, 9 or 12)
    #[serde(default = "default_max_installments")]
    #[validate(range(min = 1, max = 12))]
    pub max_installments: u32,

    /// Always require 3-D Secure authentication
    #[serde(default = "default_true")]
    pub force_3ds: bool,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}
fn default_public_base_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_true() -> bool {
    true
}
fn default_max_installments() -> u32 {
    DEFAULT_MAX_INSTALLMENTS
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn validate_environment(value: &str) -> Result<(), ValidationError> {
    if value == "sandbox" || value == "production" {
        Ok(())
    } else {
        let mut err = ValidationError::new("environment");
        err.message = Some("environment must be \"sandbox\" or \"production\"".into());
        Err(err)
    }
}

impl GatewayConfig {
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Gateway API base URL for the configured environment.
    pub fn api_url(&self) -> String {
        if let Some(url) = &self.api_base_url {
            return url.trim_end_matches('/').to_string();
        }
        if self.is_production() {
            consts::API_URL_PRODUCTION.to_string()
        } else {
            consts::API_URL_SANDBOX.to_string()
        }
    }

    /// Hosted checkout page base URL for the configured environment.
    pub fn checkout_url(&self) -> &'static str {
        if self.is_production() {
            consts::CHECKOUT_URL_PRODUCTION
        } else {
            consts::CHECKOUT_URL_SANDBOX
        }
    }

    /// Callback URL sent to the gateway. The gateway requires HTTPS in
    /// production, so a plain-HTTP base is upgraded.
    pub fn callback_url(&self) -> String {
        let base = if let Some(rest) = self.public_base_url.strip_prefix("http://") {
            format!("https://{}", rest)
        } else {
            self.public_base_url.clone()
        };
        format!("{}/payment/iyzico/callback", base.trim_end_matches('/'))
    }

    /// Offered installment counts, capped by configuration. Single payment
    /// is always offered.
    pub fn enabled_installments(&self) -> Vec<u32> {
        if !self.enable_installments {
            return vec![1];
        }
        consts::INSTALLMENT_OPTIONS
            .iter()
            .copied()
            .filter(|count| *count <= self.max_installments)
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Load configuration from `config/{default,ENV}` files and `APP__`-prefixed
/// environment variables. Missing credentials fail here, before any network
/// call is attempted.
pub fn load_config() -> Result<GatewayConfig, ConfigLoadError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    // NOTE: api_key/secret_key have no defaults - they MUST come from a
    // config file or environment so insecure placeholders never reach
    // production.
    let config = Config::builder()
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("api_key").is_err() || config.get_string("secret_key").is_err() {
        error!("Gateway credentials are not configured. Set APP__API_KEY and APP__SECRET_KEY from the merchant panel.");
        return Err(ConfigLoadError::Load(ConfigError::NotFound(
            "api_key/secret_key are required but not configured".into(),
        )));
    }

    let gateway_config: GatewayConfig = config.try_deserialize()?;

    gateway_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        ConfigLoadError::Validation(e)
    })?;

    Ok(gateway_config)
}

/// Initialize the tracing subscriber. RUST_LOG takes precedence over the
/// configured level.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("iyzico_gateway={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}
