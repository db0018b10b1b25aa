// coursepay/src/gateway/merchant_redirect.rs

use super::dto::{newest_first, VerifierTransactionDto};
use super::http::{build_client, config_error, decode, endpoint, parse_base_url, success_body, transport_error};
use super::{GatewayIntent, GatewayKind, GatewaySettings, IntentRequest, PaymentGateway};
use crate::error::CheckoutError;
use crate::model::{GatewayTransaction, PaymentStatus, VerifiedPayment};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

pub const DEFAULT_CHECKOUT_BASE: &str = "https://www.paypal.com/cgi-bin/webscr";
pub const SANDBOX_CHECKOUT_BASE: &str = "https://www.sandbox.paypal.com/cgi-bin/webscr";

const KIND: GatewayKind = GatewayKind::MerchantRedirect;

/// Maps the redirect gateway's status words onto the internal vocabulary.
/// Words it shares with the canonical set pass through unchanged.
pub fn map_status(raw: &str) -> PaymentStatus {
  match raw.trim().to_ascii_lowercase().as_str() {
    "completed" => PaymentStatus::Approved,
    "processed" => PaymentStatus::InProcess,
    "denied" | "failed" | "expired" | "voided" => PaymentStatus::Rejected,
    "reversed" => PaymentStatus::ChargedBack,
    "canceled_reversal" => PaymentStatus::Approved,
    _ => PaymentStatus::parse(raw),
  }
}

/// Gateway where the buyer is redirected to a URL built from the merchant's
/// account email. Status and history come from an optional verification
/// service; without one, payments stay pending and sync finds nothing.
pub struct MerchantRedirectGateway {
  client: Client,
  checkout_base: Url,
  merchant_email: Option<String>,
  verifier: Option<Url>,
}

impl MerchantRedirectGateway {
  pub fn new(settings: &GatewaySettings) -> Result<Self, CheckoutError> {
    let default_base = if settings.sandbox {
      SANDBOX_CHECKOUT_BASE
    } else {
      DEFAULT_CHECKOUT_BASE
    };
    let checkout_base = settings.checkout_base.as_deref().unwrap_or(default_base);
    let verifier = match settings.verifier_url.as_deref().filter(|v| !v.trim().is_empty()) {
      Some(raw) => Some(parse_base_url(KIND, "verifier url", raw)?),
      None => None,
    };

    Ok(Self {
      client: build_client(KIND, settings.timeout)?,
      checkout_base: parse_base_url(KIND, "checkout base", checkout_base)?,
      merchant_email: settings.merchant_email.clone().filter(|e| !e.trim().is_empty()),
      verifier,
    })
  }

  fn merchant_email(&self) -> Result<&str, CheckoutError> {
    self
      .merchant_email
      .as_deref()
      .ok_or_else(|| config_error(KIND, "merchant email is not configured"))
  }
}

#[async_trait]
impl PaymentGateway for MerchantRedirectGateway {
  fn kind(&self) -> GatewayKind {
    KIND
  }

  #[instrument(
    name = "MerchantRedirectGateway::create_intent",
    skip_all,
    fields(course_id = %request.course.id, external_reference = %request.external_reference),
    err(Display)
  )]
  async fn create_intent(&self, request: &IntentRequest) -> Result<GatewayIntent, CheckoutError> {
    let business = self.merchant_email()?;
    let intent_id = format!("mr_{}", Uuid::new_v4().simple());

    let mut checkout_url = self.checkout_base.clone();
    checkout_url
      .query_pairs_mut()
      .append_pair("cmd", "_xclick")
      .append_pair("business", business)
      .append_pair("item_name", &request.course.title)
      .append_pair("item_number", request.course.id.as_str())
      .append_pair("amount", &request.course.price_decimal())
      .append_pair("currency_code", &request.course.currency)
      .append_pair("quantity", "1")
      .append_pair("no_shipping", "1")
      .append_pair("custom", &request.external_reference.to_string())
      .append_pair("invoice", &intent_id)
      .append_pair("return", request.return_urls.success.as_str())
      .append_pair("cancel_return", request.return_urls.failure.as_str());

    info!(intent_id = %intent_id, "Redirect checkout URL built.");
    Ok(GatewayIntent { intent_id, checkout_url })
  }

  #[instrument(name = "MerchantRedirectGateway::verify_status", skip(self), err(Display))]
  async fn verify_status(&self, payment_id: &str) -> Result<VerifiedPayment, CheckoutError> {
    let payment_id = payment_id.trim();
    let Some(verifier) = &self.verifier else {
      debug!("No verification service configured; reporting payment as pending.");
      return Ok(VerifiedPayment {
        payment_id: payment_id.to_string(),
        status: PaymentStatus::Pending,
        external_reference: None,
      });
    };

    let url = endpoint(KIND, verifier, &["payments", payment_id])?;
    let response = self.client.get(url).send().await.map_err(|e| transport_error(KIND, e))?;

    if response.status() == StatusCode::NOT_FOUND {
      warn!("Verification service has no payment under this id.");
      return Ok(VerifiedPayment {
        payment_id: payment_id.to_string(),
        status: PaymentStatus::NotFound,
        external_reference: None,
      });
    }

    let bytes = success_body(KIND, response).await?;
    let transaction: VerifierTransactionDto = decode(KIND, "verified payment", &bytes)?;
    Ok(transaction.into_verified(map_status))
  }

  #[instrument(name = "MerchantRedirectGateway::list_recent_transactions", skip(self), err(Display))]
  async fn list_recent_transactions(&self, limit: usize) -> Result<Vec<GatewayTransaction>, CheckoutError> {
    let Some(verifier) = &self.verifier else {
      debug!("No verification service configured; no transaction history available.");
      return Ok(Vec::new());
    };

    let mut url = endpoint(KIND, verifier, &["payments"])?;
    url.query_pairs_mut().append_pair("limit", &limit.to_string());

    let response = self.client.get(url).send().await.map_err(|e| transport_error(KIND, e))?;
    let bytes = success_body(KIND, response).await?;
    let listing: Vec<VerifierTransactionDto> = decode(KIND, "transaction listing", &bytes)?;

    let transactions = listing.into_iter().map(|t| t.into_transaction(map_status)).collect();
    Ok(newest_first(transactions, limit))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn maps_redirect_vocabulary() {
    assert_eq!(map_status("Completed"), PaymentStatus::Approved);
    assert_eq!(map_status("Pending"), PaymentStatus::Pending);
    assert_eq!(map_status("Denied"), PaymentStatus::Rejected);
    assert_eq!(map_status("Reversed"), PaymentStatus::ChargedBack);
    assert_eq!(map_status("refunded"), PaymentStatus::Refunded);
  }
}
