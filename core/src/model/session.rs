// coursepay/src/model/session.rs

use super::UserId;
use crate::error::CheckoutError;
use serde::{Deserialize, Serialize};

/// The authenticated buyer, as resolved by the auth layer in front of the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
  pub id: UserId,
  pub email: String,
}

/// Whoever is on the other end of the request. A return from the gateway may
/// arrive before the session has been restored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
  pub user: Option<SessionUser>,
}

impl SessionContext {
  pub fn anonymous() -> Self {
    Self { user: None }
  }

  pub fn signed_in(user: SessionUser) -> Self {
    Self { user: Some(user) }
  }

  pub fn require_user(&self) -> Result<&SessionUser, CheckoutError> {
    self.user.as_ref().ok_or(CheckoutError::Unauthenticated)
  }
}
