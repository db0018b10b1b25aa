// coursepay/src/gateway/http.rs

//! HTTP plumbing shared by the gateway adapters: client construction, URL
//! assembly, and mapping transport failures onto `CheckoutError`.

use super::GatewayKind;
use crate::error::CheckoutError;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

const BODY_SNIPPET_LIMIT: usize = 200;

pub(crate) fn build_client(gateway: GatewayKind, timeout: Duration) -> Result<Client, CheckoutError> {
  Client::builder()
    .timeout(timeout)
    .build()
    .map_err(|e| config_error(gateway, format!("failed to build HTTP client: {}", e)))
}

pub(crate) fn parse_base_url(gateway: GatewayKind, field: &str, raw: &str) -> Result<Url, CheckoutError> {
  let url = Url::parse(raw.trim()).map_err(|e| config_error(gateway, format!("{} '{}' is not a valid URL: {}", field, raw, e)))?;
  if url.cannot_be_a_base() {
    return Err(config_error(gateway, format!("{} '{}' cannot be used as a base URL", field, raw)));
  }
  Ok(url)
}

/// Appends path segments to `base`, percent-encoding each one.
pub(crate) fn endpoint(gateway: GatewayKind, base: &Url, segments: &[&str]) -> Result<Url, CheckoutError> {
  let mut url = base.clone();
  url
    .path_segments_mut()
    .map_err(|_| config_error(gateway, format!("base URL '{}' cannot take path segments", base)))?
    .pop_if_empty()
    .extend(segments);
  Ok(url)
}

pub(crate) fn config_error(gateway: GatewayKind, message: impl Into<String>) -> CheckoutError {
  CheckoutError::GatewayConfig {
    gateway,
    message: message.into(),
  }
}

pub(crate) fn transport_error(gateway: GatewayKind, err: reqwest::Error) -> CheckoutError {
  let message = if err.is_timeout() {
    "request timed out".to_string()
  } else if err.is_connect() {
    "could not connect to the gateway".to_string()
  } else {
    format!("transport failure: {}", err)
  };
  CheckoutError::GatewayRequest {
    gateway,
    message,
    http_status: err.status().map(|s| s.as_u16()),
  }
}

/// Reads the body of a response, failing with its status and a short body
/// snippet when the status is not a success.
pub(crate) async fn success_body(gateway: GatewayKind, response: Response) -> Result<Vec<u8>, CheckoutError> {
  let status = response.status();
  let body = response.bytes().await.map_err(|e| transport_error(gateway, e))?;
  if !status.is_success() {
    return Err(status_error(gateway, status, &body));
  }
  Ok(body.to_vec())
}

pub(crate) fn status_error(gateway: GatewayKind, status: StatusCode, body: &[u8]) -> CheckoutError {
  let text = String::from_utf8_lossy(body);
  let snippet: String = text.chars().take(BODY_SNIPPET_LIMIT).collect();
  CheckoutError::GatewayRequest {
    gateway,
    message: format!("unexpected status {}: {}", status, snippet.trim()),
    http_status: Some(status.as_u16()),
  }
}

pub(crate) fn decode<T: DeserializeOwned>(gateway: GatewayKind, what: &str, body: &[u8]) -> Result<T, CheckoutError> {
  serde_json::from_slice(body).map_err(|e| CheckoutError::GatewayRequest {
    gateway,
    message: format!("could not decode {}: {}", what, e),
    http_status: None,
  })
}
