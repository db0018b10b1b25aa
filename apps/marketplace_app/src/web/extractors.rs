// apps/marketplace_app/src/web/extractors.rs

use actix_web::{FromRequest, HttpRequest};
use coursepay::{SessionUser, UserId};
use tracing::warn;

use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "X-User-ID";
pub const USER_EMAIL_HEADER: &str = "X-User-Email";

/// Signed-in user as forwarded by the auth proxy in front of this service.
#[derive(Debug)]
pub struct AuthenticatedUser {
  pub user: SessionUser,
}

fn header_value<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
  req
    .headers()
    .get(name)
    .and_then(|value| value.to_str().ok())
    .map(str::trim)
    .filter(|value| !value.is_empty())
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
  let raw_id = header_value(req, USER_ID_HEADER)
    .ok_or_else(|| AppError::Auth(format!("Missing {} header.", USER_ID_HEADER)))?;
  let id = UserId::new(raw_id).map_err(|e| AppError::Auth(format!("Invalid {} header: {}", USER_ID_HEADER, e)))?;
  let email = header_value(req, USER_EMAIL_HEADER)
    .ok_or_else(|| AppError::Auth(format!("Missing {} header.", USER_EMAIL_HEADER)))?;
  Ok(AuthenticatedUser {
    user: SessionUser {
      id,
      email: email.to_string(),
    },
  })
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = futures_util::future::Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    let result = authenticate(req);
    if let Err(e) = &result {
      warn!("AuthenticatedUser extractor: {}", e);
    }
    futures_util::future::ready(result)
  }
}
