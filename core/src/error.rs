// coursepay/src/error.rs

use crate::gateway::GatewayKind;
use crate::model::UserId;
use crate::reference::ReferenceParseError;
use thiserror::Error;

/// Failures raised by the pipeline machinery itself rather than by a step's
/// business logic.
#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("Context value '{field}' was not set before step '{step_name}'")]
  MissingContextValue { step_name: &'static str, field: &'static str },

  #[error("Internal pipeline error: {0}")]
  Internal(String),
}

/// Every failure a checkout, return reconciliation, sync or grant can surface.
#[derive(Error, Debug)]
pub enum CheckoutError {
  /// The merchant has not configured credentials for the active gateway.
  #[error("Payment gateway '{gateway}' is not configured: {message}")]
  GatewayConfig { gateway: GatewayKind, message: String },

  /// Network failure, timeout, non-success response, or an undecodable body.
  #[error("Payment gateway '{gateway}' request failed: {message}")]
  GatewayRequest {
    gateway: GatewayKind,
    message: String,
    http_status: Option<u16>,
  },

  /// The payment's external reference names a different user than the session.
  #[error("Payment {payment_id} was made by user '{reference_user}', not by the signed-in user '{session_user}'")]
  OwnershipMismatch {
    payment_id: String,
    reference_user: UserId,
    session_user: UserId,
  },

  #[error("Malformed external reference: {0}")]
  Parse(#[from] ReferenceParseError),

  #[error("Ledger read failed during {operation}: {source}")]
  LedgerRead {
    operation: &'static str,
    #[source]
    source: anyhow::Error,
  },

  #[error("Ledger write failed during {operation}: {source}")]
  LedgerWrite {
    operation: &'static str,
    #[source]
    source: anyhow::Error,
  },

  #[error("Validation error: {0}")]
  Validation(String),

  #[error("A signed-in user is required to confirm a payment")]
  Unauthenticated,

  #[error("Pipeline error: {0}")]
  Pipeline(#[from] PipelineError),
}

impl CheckoutError {
  pub fn ledger_read(operation: &'static str, source: impl Into<anyhow::Error>) -> Self {
    CheckoutError::LedgerRead {
      operation,
      source: source.into(),
    }
  }

  pub fn ledger_write(operation: &'static str, source: impl Into<anyhow::Error>) -> Self {
    CheckoutError::LedgerWrite {
      operation,
      source: source.into(),
    }
  }

  /// Whether retrying the same call later may succeed without anyone changing
  /// configuration or data.
  pub fn is_retryable(&self) -> bool {
    matches!(
      self,
      CheckoutError::GatewayRequest { .. } | CheckoutError::LedgerRead { .. } | CheckoutError::LedgerWrite { .. }
    )
  }

  /// Whether the buyer should be pointed at "Sync purchases" as a recovery path.
  pub fn suggests_sync(&self) -> bool {
    matches!(
      self,
      CheckoutError::GatewayRequest { .. }
        | CheckoutError::OwnershipMismatch { .. }
        | CheckoutError::Parse(_)
        | CheckoutError::LedgerWrite { .. }
    )
  }

  /// Message safe to show to the buyer. Never includes gateway bodies or tokens.
  pub fn advisory(&self) -> String {
    match self {
      CheckoutError::GatewayConfig { .. } => {
        "Payments are not available right now. The store has not finished setting up its payment provider.".to_string()
      }
      CheckoutError::GatewayRequest { .. } => {
        "We could not reach the payment provider. If you completed a payment, use \"Sync purchases\" in a moment to unlock your course.".to_string()
      }
      CheckoutError::OwnershipMismatch { .. } => {
        "This payment belongs to a different account. Sign in with the account that paid, then use \"Sync purchases\".".to_string()
      }
      CheckoutError::Parse(_) => {
        "We could not match this payment to a course. Use \"Sync purchases\" or contact support.".to_string()
      }
      CheckoutError::LedgerRead { .. } => "We could not load your purchases. Please try again.".to_string(),
      CheckoutError::LedgerWrite { .. } => {
        "Your payment went through but we could not unlock the course yet. Use \"Sync purchases\" to retry; you will not be charged again.".to_string()
      }
      CheckoutError::Validation(message) => message.clone(),
      CheckoutError::Unauthenticated => "Please sign in to finish confirming your purchase.".to_string(),
      CheckoutError::Pipeline(_) => {
        "Something went wrong while processing your purchase. Use \"Sync purchases\" to finish unlocking it.".to_string()
      }
    }
  }
}

pub type CheckoutResult<T> = Result<T, CheckoutError>;
