// coursepay/src/gateway/mod.rs

//! Payment gateway client. One trait, two adapters:
//! - `PreferenceGateway`: server-side checkout preference, payments API for
//!   verification and search.
//! - `MerchantRedirectGateway`: a redirect URL built locally, with
//!   an optional verification service for status and history.

mod dto;
mod http;
pub mod merchant_redirect;
pub mod preference;

pub use merchant_redirect::MerchantRedirectGateway;
pub use preference::PreferenceGateway;

use crate::error::CheckoutError;
use crate::model::{Course, GatewayTransaction, VerifiedPayment};
use crate::reference::ExternalReference;
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayKind {
  Preference,
  MerchantRedirect,
}

impl GatewayKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      GatewayKind::Preference => "preference",
      GatewayKind::MerchantRedirect => "merchant_redirect",
    }
  }
}

impl fmt::Display for GatewayKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for GatewayKind {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "preference" | "a" => Ok(GatewayKind::Preference),
      "merchant_redirect" | "redirect" | "b" => Ok(GatewayKind::MerchantRedirect),
      other => Err(format!("unknown payment gateway '{}'", other)),
    }
  }
}

/// Where the gateway sends the buyer after each outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnUrls {
  pub success: Url,
  pub failure: Url,
  pub pending: Url,
}

impl ReturnUrls {
  /// All three outcomes land on the same return endpoint, tagged with
  /// `outcome=<success|failure|pending>`.
  pub fn from_return_endpoint(endpoint: &Url) -> Self {
    let tagged = |outcome: &str| {
      let mut url = endpoint.clone();
      url.query_pairs_mut().append_pair("outcome", outcome);
      url
    };
    Self {
      success: tagged("success"),
      failure: tagged("failure"),
      pending: tagged("pending"),
    }
  }
}

#[derive(Debug, Clone)]
pub struct IntentRequest {
  pub course: Course,
  pub payer_email: String,
  pub external_reference: ExternalReference,
  pub return_urls: ReturnUrls,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayIntent {
  pub intent_id: String,
  pub checkout_url: Url,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  fn kind(&self) -> GatewayKind;

  /// Creates a checkout intent and returns where to send the buyer.
  async fn create_intent(&self, request: &IntentRequest) -> Result<GatewayIntent, CheckoutError>;

  /// Authoritative status lookup. An unknown id is reported as
  /// `PaymentStatus::NotFound`, not as an error.
  async fn verify_status(&self, payment_id: &str) -> Result<VerifiedPayment, CheckoutError>;

  /// Up to `limit` most recent merchant transactions, newest first.
  async fn list_recent_transactions(&self, limit: usize) -> Result<Vec<GatewayTransaction>, CheckoutError>;
}

/// Everything needed to build the active gateway adapter.
///
/// Credentials may be absent: the adapter still builds, and each call fails
/// with `CheckoutError::GatewayConfig` until they are provided.
#[derive(Clone)]
pub struct GatewaySettings {
  pub kind: GatewayKind,
  pub access_token: Option<String>,
  pub merchant_email: Option<String>,
  pub api_base: String,
  pub checkout_base: Option<String>,
  pub verifier_url: Option<String>,
  pub sandbox: bool,
  pub timeout: Duration,
}

impl Default for GatewaySettings {
  fn default() -> Self {
    Self {
      kind: GatewayKind::Preference,
      access_token: None,
      merchant_email: None,
      api_base: preference::DEFAULT_API_BASE.to_string(),
      checkout_base: None,
      verifier_url: None,
      sandbox: false,
      timeout: DEFAULT_GATEWAY_TIMEOUT,
    }
  }
}

// Hand-written so the access token never ends up in logs.
impl fmt::Debug for GatewaySettings {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("GatewaySettings")
      .field("kind", &self.kind)
      .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
      .field("merchant_email", &self.merchant_email)
      .field("api_base", &self.api_base)
      .field("checkout_base", &self.checkout_base)
      .field("verifier_url", &self.verifier_url)
      .field("sandbox", &self.sandbox)
      .field("timeout", &self.timeout)
      .finish()
  }
}

impl GatewaySettings {
  pub fn build(&self) -> Result<Arc<dyn PaymentGateway>, CheckoutError> {
    let gateway: Arc<dyn PaymentGateway> = match self.kind {
      GatewayKind::Preference => Arc::new(PreferenceGateway::new(self)?),
      GatewayKind::MerchantRedirect => Arc::new(MerchantRedirectGateway::new(self)?),
    };
    tracing::info!(gateway = %self.kind, sandbox = self.sandbox, "Payment gateway adapter built.");
    Ok(gateway)
  }
}
