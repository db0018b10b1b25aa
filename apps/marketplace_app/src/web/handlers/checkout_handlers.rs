// apps/marketplace_app/src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpResponse};
use coursepay::{ReturnOutcome, ReturnParams, SessionContext, UnresolvedReason};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::parse_course_id;
use crate::db::catalog;
use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

// --- Response DTOs ---

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutStartedResponse {
  pub sale_id: Uuid,
  pub intent_id: String,
  pub redirect_url: String,
  pub gateway: String,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReturnStatusResponse {
  pub state: &'static str,
  pub payment_id: Option<String>,
  pub course_id: Option<String>,
  pub status: Option<String>,
  pub newly_enrolled: bool,
  pub reason: Option<String>,
  pub advisory: Option<String>,
  pub clear_query: bool,
  pub offer_sync: bool,
}

impl From<&ReturnOutcome> for ReturnStatusResponse {
  fn from(outcome: &ReturnOutcome) -> Self {
    let (course_id, status, newly_enrolled, reason) = match outcome {
      ReturnOutcome::Idle => (None, None, false, None),
      ReturnOutcome::Confirmed {
        course_id,
        newly_enrolled,
        ..
      } => (Some(course_id.to_string()), Some("approved".to_string()), *newly_enrolled, None),
      ReturnOutcome::AwaitingApproval { status, .. } => (None, Some(status.to_string()), false, None),
      ReturnOutcome::Unresolved { status, reason, .. } => {
        let reason = match reason {
          UnresolvedReason::NotApproved => "not_approved".to_string(),
          UnresolvedReason::MissingReference => "missing_reference".to_string(),
          UnresolvedReason::MalformedReference(e) => format!("malformed_reference: {}", e),
        };
        (None, Some(status.to_string()), false, Some(reason))
      }
    };
    Self {
      state: outcome.state_name(),
      payment_id: outcome.payment_id().map(str::to_string),
      course_id,
      status,
      newly_enrolled,
      reason,
      advisory: outcome.advisory(),
      clear_query: outcome.clears_query(),
      offer_sync: outcome.offers_sync(),
    }
  }
}

// --- Handler Implementation ---

#[instrument(
    name = "handler::start_checkout",
    skip(app_state, path, auth_user),
    fields(user_id = %auth_user.user.id, course_id = %path.as_ref())
)]
pub async fn start_checkout_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let course_id = parse_course_id(path.into_inner())?;
  let course = catalog::find_course(&app_state.db_pool, &course_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Course with ID {} not found.", course_id)))?;

  // Paying twice for the same course would only end in AlreadyEnrolled.
  if app_state.reconciliation.has_access(&auth_user.user.id, &course_id).await? {
    warn!("User {} already owns course {}; not starting checkout.", auth_user.user.id, course_id);
    return Ok(HttpResponse::Conflict().json(json!({
        "error": "You already have access to this course.",
        "code": "already_enrolled",
        "courseId": course_id
    })));
  }

  let redirect = app_state.reconciliation.initiate_checkout(&course, &auth_user.user).await?;
  info!(sale_id = %redirect.sale_id, intent_id = %redirect.intent_id, "Checkout started.");

  Ok(HttpResponse::Created().json(CheckoutStartedResponse {
    sale_id: redirect.sale_id,
    intent_id: redirect.intent_id,
    redirect_url: redirect.redirect_url.to_string(),
    gateway: app_state.reconciliation.gateway_kind().to_string(),
  }))
}

/// Landing endpoint for buyers coming back from the gateway. Query keys from
/// either gateway are accepted (`payment_id`, `collection_id`, `tx` and their
/// status counterparts).
#[instrument(name = "handler::checkout_return", skip(app_state, query, auth_user))]
pub async fn checkout_return_handler(
  app_state: web::Data<AppState>,
  query: web::Query<HashMap<String, String>>,
  auth_user: Option<AuthenticatedUser>,
) -> Result<HttpResponse, AppError> {
  let params = ReturnParams::from_pairs(query.iter());
  let session = match auth_user {
    Some(auth) => SessionContext::signed_in(auth.user),
    None => SessionContext::anonymous(),
  };

  let outcome = app_state.reconciliation.reconcile_return(&session, params).await?;
  info!(state = outcome.state_name(), payment_id = ?outcome.payment_id(), "Return reconciled.");

  Ok(HttpResponse::Ok().json(ReturnStatusResponse::from(&outcome)))
}
