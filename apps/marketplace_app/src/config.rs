// apps/marketplace_app/src/config.rs

use crate::errors::{AppError, Result}; // Use AppError specific Result
use coursepay::{GatewayKind, GatewaySettings, ReconcileSettings, Url, DEFAULT_SYNC_LOOKBACK};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Json,
}

impl FromStr for LogFormat {
  type Err = String;

  fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "pretty" | "text" => Ok(LogFormat::Pretty),
      "json" => Ok(LogFormat::Json),
      other => Err(format!("unknown log format '{}'", other)),
    }
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  /// Public origin of this service; gateway return URLs are built from it.
  pub app_base_url: String,

  pub gateway: GatewaySettings,
  pub sync_lookback: usize,
  pub log_format: LogFormat,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|var_name| env::var(var_name).ok())
  }

  /// Builds the configuration from any variable source. `from_env` passes the
  /// process environment; tests pass a map.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_env = |var_name: &str| {
      lookup(var_name)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", var_name)))
    };
    let parse_env = |var_name: &str, default: &str| -> Result<String> {
      Ok(get_env(var_name).unwrap_or_else(|_| default.to_string()))
    };

    let server_host = parse_env("SERVER_HOST", "127.0.0.1")?;
    let server_port = parse_env("SERVER_PORT", "8080")?
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL")?;
    let app_base_url = get_env("APP_BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port));

    let kind = parse_env("PAYMENT_GATEWAY", "preference")?
      .parse::<GatewayKind>()
      .map_err(AppError::Config)?;
    let sandbox = parse_env("GATEWAY_SANDBOX", "false")?
      .parse::<bool>()
      .map_err(|e| AppError::Config(format!("Invalid GATEWAY_SANDBOX value: {}", e)))?;
    let timeout_secs = parse_env("GATEWAY_TIMEOUT_SECS", "15")?
      .parse::<u64>()
      .map_err(|e| AppError::Config(format!("Invalid GATEWAY_TIMEOUT_SECS: {}", e)))?;
    let defaults = GatewaySettings::default();
    let gateway = GatewaySettings {
      kind,
      access_token: get_env("GATEWAY_ACCESS_TOKEN").ok(),
      merchant_email: get_env("GATEWAY_MERCHANT_EMAIL").ok(),
      api_base: get_env("GATEWAY_API_BASE").unwrap_or(defaults.api_base),
      checkout_base: get_env("GATEWAY_CHECKOUT_BASE").ok(),
      verifier_url: get_env("GATEWAY_VERIFIER_URL").ok(),
      sandbox,
      timeout: Duration::from_secs(timeout_secs.max(1)),
    };

    let sync_lookback = parse_env("SYNC_LOOKBACK", &DEFAULT_SYNC_LOOKBACK.to_string())?
      .parse::<usize>()
      .map_err(|e| AppError::Config(format!("Invalid SYNC_LOOKBACK: {}", e)))?;
    let log_format = parse_env("LOG_FORMAT", "pretty")?
      .parse::<LogFormat>()
      .map_err(AppError::Config)?;

    Ok(Self {
      server_host,
      server_port,
      database_url,
      app_base_url,
      gateway,
      sync_lookback,
      log_format,
    })
  }

  pub fn has_gateway_credentials(&self) -> bool {
    match self.gateway.kind {
      GatewayKind::Preference => self.gateway.access_token.is_some(),
      GatewayKind::MerchantRedirect => self.gateway.merchant_email.is_some(),
    }
  }

  /// The URL the gateway sends buyers back to.
  pub fn return_endpoint(&self) -> Result<Url> {
    let raw = format!("{}/api/v1/checkout/return", self.app_base_url.trim_end_matches('/'));
    Url::parse(&raw).map_err(|e| AppError::Config(format!("Invalid APP_BASE_URL '{}': {}", self.app_base_url, e)))
  }

  pub fn reconcile_settings(&self) -> Result<ReconcileSettings> {
    Ok(ReconcileSettings::new(&self.return_endpoint()?).with_sync_lookback(self.sync_lookback))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig> {
    let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    AppConfig::from_lookup(|name| map.get(name).cloned())
  }

  #[test]
  fn defaults_apply_when_only_database_is_set() {
    let config = config_from(&[("DATABASE_URL", "postgres://localhost/courses")]).unwrap();

    assert_eq!(config.server_port, 8080);
    assert_eq!(config.app_base_url, "http://127.0.0.1:8080");
    assert_eq!(config.gateway.kind, GatewayKind::Preference);
    assert_eq!(config.gateway.timeout, Duration::from_secs(15));
    assert_eq!(config.sync_lookback, DEFAULT_SYNC_LOOKBACK);
    assert_eq!(config.log_format, LogFormat::Pretty);
    assert!(config.gateway.access_token.is_none());
  }

  #[test]
  fn missing_database_url_is_a_config_error() {
    assert!(matches!(config_from(&[]), Err(AppError::Config(_))));
  }

  #[test]
  fn redirect_gateway_settings_are_read() {
    let config = config_from(&[
      ("DATABASE_URL", "postgres://localhost/courses"),
      ("APP_BASE_URL", "https://courses.example/"),
      ("PAYMENT_GATEWAY", "merchant_redirect"),
      ("GATEWAY_MERCHANT_EMAIL", "shop@example.com"),
      ("GATEWAY_SANDBOX", "true"),
      ("SYNC_LOOKBACK", "50"),
      ("LOG_FORMAT", "json"),
    ])
    .unwrap();

    assert_eq!(config.gateway.kind, GatewayKind::MerchantRedirect);
    assert_eq!(config.gateway.merchant_email.as_deref(), Some("shop@example.com"));
    assert!(config.gateway.sandbox);
    assert_eq!(config.sync_lookback, 50);
    assert_eq!(config.log_format, LogFormat::Json);
    assert_eq!(
      config.return_endpoint().unwrap().as_str(),
      "https://courses.example/api/v1/checkout/return"
    );
  }

  #[test]
  fn invalid_values_are_rejected() {
    let bad_port = config_from(&[("DATABASE_URL", "postgres://x"), ("SERVER_PORT", "eighty")]);
    let bad_gateway = config_from(&[("DATABASE_URL", "postgres://x"), ("PAYMENT_GATEWAY", "carrier-pigeon")]);

    assert!(matches!(bad_port, Err(AppError::Config(_))));
    assert!(matches!(bad_gateway, Err(AppError::Config(_))));
  }
}
