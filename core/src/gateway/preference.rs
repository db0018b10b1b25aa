// coursepay/src/gateway/preference.rs

use super::dto::{
  newest_first, BackUrlsDto, PayerDto, PaymentDto, PaymentSearchDto, PreferenceItemDto, PreferenceRequestDto,
  PreferenceResponseDto,
};
use super::http::{build_client, config_error, decode, endpoint, parse_base_url, success_body, transport_error};
use super::{GatewayIntent, GatewayKind, GatewaySettings, IntentRequest, PaymentGateway};
use crate::error::CheckoutError;
use crate::model::{GatewayTransaction, PaymentStatus, VerifiedPayment};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_API_BASE: &str = "https://api.mercadopago.com";
pub const DEFAULT_CHECKOUT_BASE: &str = "https://www.mercadopago.com/checkout/v1/redirect";

const KIND: GatewayKind = GatewayKind::Preference;

/// Gateway that creates a server-side checkout preference and exposes a
/// payments API for lookups and search.
pub struct PreferenceGateway {
  client: Client,
  api_base: Url,
  checkout_base: Url,
  access_token: Option<String>,
  sandbox: bool,
}

impl PreferenceGateway {
  pub fn new(settings: &GatewaySettings) -> Result<Self, CheckoutError> {
    let checkout_base = settings.checkout_base.as_deref().unwrap_or(DEFAULT_CHECKOUT_BASE);
    Ok(Self {
      client: build_client(KIND, settings.timeout)?,
      api_base: parse_base_url(KIND, "api base", &settings.api_base)?,
      checkout_base: parse_base_url(KIND, "checkout base", checkout_base)?,
      access_token: settings.access_token.clone().filter(|t| !t.trim().is_empty()),
      sandbox: settings.sandbox,
    })
  }

  fn token(&self) -> Result<&str, CheckoutError> {
    self
      .access_token
      .as_deref()
      .ok_or_else(|| config_error(KIND, "access token is not configured"))
  }

  /// The hosted checkout page for a preference. Prefers the link the gateway
  /// returned for the current mode, then the other one, then a URL built from
  /// the preference id.
  fn checkout_url(&self, preference: &PreferenceResponseDto) -> Result<Url, CheckoutError> {
    let (preferred, fallback) = if self.sandbox {
      (&preference.sandbox_init_point, &preference.init_point)
    } else {
      (&preference.init_point, &preference.sandbox_init_point)
    };

    if let Some(link) = preferred.as_deref().or(fallback.as_deref()).filter(|l| !l.trim().is_empty()) {
      return Url::parse(link).map_err(|e| CheckoutError::GatewayRequest {
        gateway: KIND,
        message: format!("gateway returned an invalid checkout link: {}", e),
        http_status: None,
      });
    }

    let mut url = self.checkout_base.clone();
    url.query_pairs_mut().append_pair("pref_id", &preference.id);
    Ok(url)
  }
}

#[async_trait]
impl PaymentGateway for PreferenceGateway {
  fn kind(&self) -> GatewayKind {
    KIND
  }

  #[instrument(
    name = "PreferenceGateway::create_intent",
    skip_all,
    fields(course_id = %request.course.id, external_reference = %request.external_reference),
    err(Display)
  )]
  async fn create_intent(&self, request: &IntentRequest) -> Result<GatewayIntent, CheckoutError> {
    let token = self.token()?;
    let url = endpoint(KIND, &self.api_base, &["checkout", "preferences"])?;

    let body = PreferenceRequestDto {
      items: vec![PreferenceItemDto {
        id: request.course.id.as_str(),
        title: &request.course.title,
        quantity: 1,
        unit_price: request.course.unit_price(),
        currency_id: &request.course.currency,
      }],
      payer: PayerDto {
        email: &request.payer_email,
      },
      back_urls: BackUrlsDto {
        success: request.return_urls.success.as_str(),
        failure: request.return_urls.failure.as_str(),
        pending: request.return_urls.pending.as_str(),
      },
      auto_return: "approved",
      external_reference: request.external_reference.to_string(),
    };

    let response = self
      .client
      .post(url)
      .bearer_auth(token)
      .json(&body)
      .send()
      .await
      .map_err(|e| transport_error(KIND, e))?;
    let bytes = success_body(KIND, response).await?;
    let preference: PreferenceResponseDto = decode(KIND, "checkout preference", &bytes)?;

    let checkout_url = self.checkout_url(&preference)?;
    info!(intent_id = %preference.id, "Checkout preference created.");
    Ok(GatewayIntent {
      intent_id: preference.id,
      checkout_url,
    })
  }

  #[instrument(name = "PreferenceGateway::verify_status", skip(self), err(Display))]
  async fn verify_status(&self, payment_id: &str) -> Result<VerifiedPayment, CheckoutError> {
    let token = self.token()?;
    let url = endpoint(KIND, &self.api_base, &["v1", "payments", payment_id.trim()])?;

    let response = self
      .client
      .get(url)
      .bearer_auth(token)
      .send()
      .await
      .map_err(|e| transport_error(KIND, e))?;

    if response.status() == StatusCode::NOT_FOUND {
      warn!("Gateway has no payment under this id.");
      return Ok(VerifiedPayment {
        payment_id: payment_id.trim().to_string(),
        status: PaymentStatus::NotFound,
        external_reference: None,
      });
    }

    let bytes = success_body(KIND, response).await?;
    let payment: PaymentDto = decode(KIND, "payment", &bytes)?;
    let verified = payment.into_verified(PaymentStatus::parse);
    debug!(status = %verified.status, "Payment verified.");
    Ok(verified)
  }

  #[instrument(name = "PreferenceGateway::list_recent_transactions", skip(self), err(Display))]
  async fn list_recent_transactions(&self, limit: usize) -> Result<Vec<GatewayTransaction>, CheckoutError> {
    let token = self.token()?;
    let mut url = endpoint(KIND, &self.api_base, &["v1", "payments", "search"])?;
    url
      .query_pairs_mut()
      .append_pair("sort", "date_created")
      .append_pair("criteria", "desc")
      .append_pair("limit", &limit.to_string());

    let response = self
      .client
      .get(url)
      .bearer_auth(token)
      .send()
      .await
      .map_err(|e| transport_error(KIND, e))?;
    let bytes = success_body(KIND, response).await?;
    let search: PaymentSearchDto = decode(KIND, "payment search", &bytes)?;

    let transactions = search
      .results
      .into_iter()
      .map(|p| p.into_transaction(PaymentStatus::parse))
      .collect();
    Ok(newest_first(transactions, limit))
  }
}
