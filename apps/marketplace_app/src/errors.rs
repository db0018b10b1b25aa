// apps/marketplace_app/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use coursepay::CheckoutError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Checkout Error: {source}")]
  Checkout {
    #[from]
    source: CheckoutError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl AppError {
  /// Stable machine-readable code for the JSON body.
  pub fn code(&self) -> &'static str {
    match self {
      AppError::Validation(_) => "validation",
      AppError::Auth(_) => "unauthenticated",
      AppError::NotFound(_) => "not_found",
      AppError::Config(_) => "configuration",
      AppError::Sqlx(_) => "database",
      AppError::Checkout { source } => match source {
        CheckoutError::GatewayConfig { .. } => "gateway_not_configured",
        CheckoutError::GatewayRequest { .. } => "gateway_unavailable",
        CheckoutError::OwnershipMismatch { .. } => "ownership_mismatch",
        CheckoutError::Parse(_) => "malformed_reference",
        CheckoutError::LedgerRead { .. } | CheckoutError::LedgerWrite { .. } => "ledger",
        CheckoutError::Validation(_) => "validation",
        CheckoutError::Unauthenticated => "unauthenticated",
        CheckoutError::Pipeline(_) => "internal",
      },
      AppError::Internal(_) => "internal",
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
      AppError::Checkout { source } => match source {
        CheckoutError::GatewayConfig { .. } => StatusCode::SERVICE_UNAVAILABLE,
        CheckoutError::GatewayRequest { .. } => StatusCode::BAD_GATEWAY,
        CheckoutError::OwnershipMismatch { .. } => StatusCode::FORBIDDEN,
        CheckoutError::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CheckoutError::Validation(_) => StatusCode::BAD_REQUEST,
        CheckoutError::Unauthenticated => StatusCode::UNAUTHORIZED,
        CheckoutError::LedgerRead { .. } | CheckoutError::LedgerWrite { .. } | CheckoutError::Pipeline(_) => {
          StatusCode::INTERNAL_SERVER_ERROR
        }
      },
    }
  }

  fn error_response(&self) -> HttpResponse {
    // Log the full error when it's turned into a response
    tracing::error!(application_error = %self, code = self.code(), "Responding with error");
    let body = match self {
      AppError::Validation(m) | AppError::Auth(m) | AppError::NotFound(m) => json!({
        "error": m,
        "code": self.code(),
      }),
      AppError::Config(m) => json!({"error": "Configuration issue", "detail": m, "code": self.code()}),
      AppError::Sqlx(_) => json!({"error": "Database operation failed", "code": self.code(), "retryable": true}),
      AppError::Checkout { source } => json!({
        "error": source.advisory(),
        "code": self.code(),
        "retryable": source.is_retryable(),
        "offerSync": source.suggests_sync(),
      }),
      AppError::Internal(_) => json!({"error": "An internal error occurred", "code": self.code()}),
    };
    HttpResponse::build(self.status_code()).json(body)
  }
}

// Define a Result type alias for the application
pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::body::to_bytes;
  use coursepay::{GatewayKind, UserId};

  async fn body_of(err: AppError) -> serde_json::Value {
    let bytes = to_bytes(err.error_response().into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  #[test]
  fn checkout_errors_map_to_http_statuses() {
    let gateway_down = AppError::from(CheckoutError::GatewayRequest {
      gateway: GatewayKind::Preference,
      message: "request timed out".into(),
      http_status: None,
    });
    let not_configured = AppError::from(CheckoutError::GatewayConfig {
      gateway: GatewayKind::MerchantRedirect,
      message: "merchant email missing".into(),
    });
    let unauthenticated = AppError::from(CheckoutError::Unauthenticated);

    assert_eq!(gateway_down.status_code(), StatusCode::BAD_GATEWAY);
    assert_eq!(not_configured.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
  }

  #[actix_rt::test]
  async fn ownership_mismatch_body_is_buyer_safe() {
    let err = AppError::from(CheckoutError::OwnershipMismatch {
      payment_id: "P1".into(),
      reference_user: UserId::new("U1").unwrap(),
      session_user: UserId::new("U2").unwrap(),
    });
    assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

    let body = body_of(err).await;
    assert_eq!(body["code"], "ownership_mismatch");
    assert_eq!(body["offerSync"], true);
    assert_eq!(body["retryable"], false);
    assert!(!body["error"].as_str().unwrap().contains("U1"));
  }

  #[actix_rt::test]
  async fn gateway_failure_body_hides_upstream_detail() {
    let err = AppError::from(CheckoutError::GatewayRequest {
      gateway: GatewayKind::Preference,
      message: "HTTP 500: secret upstream body".into(),
      http_status: Some(500),
    });

    let body = body_of(err).await;
    assert_eq!(body["retryable"], true);
    assert!(!body["error"].as_str().unwrap().contains("secret"));
  }
}
