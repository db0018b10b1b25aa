// apps/marketplace_app/src/web/handlers/purchase_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};

use super::parse_course_id;
use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

/// "Sync purchases": grants anything the user paid for that never made it
/// back through the return page.
#[instrument(name = "handler::sync_purchases", skip(app_state, auth_user), fields(user_id = %auth_user.user.id))]
pub async fn sync_purchases_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let report = app_state.reconciliation.sync_purchases(&auth_user.user).await?;
  info!(scanned = report.scanned, enrolled = report.enrolled, "Purchase sync finished.");

  let message = match report.enrolled {
    0 => "No new purchases found.".to_string(),
    1 => "1 course unlocked.".to_string(),
    n => format!("{} courses unlocked.", n),
  };
  Ok(HttpResponse::Ok().json(json!({
      "message": message,
      "report": report
  })))
}

#[instrument(name = "handler::list_enrollments", skip(app_state, auth_user), fields(user_id = %auth_user.user.id))]
pub async fn list_enrollments_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let enrollments = app_state.reconciliation.enrollments(&auth_user.user.id).await?;
  Ok(HttpResponse::Ok().json(json!({ "enrollments": enrollments })))
}

#[instrument(name = "handler::list_sales", skip(app_state, auth_user), fields(user_id = %auth_user.user.id))]
pub async fn list_sales_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let sales = app_state.reconciliation.sales(&auth_user.user.id).await?;
  Ok(HttpResponse::Ok().json(json!({ "sales": sales })))
}

#[instrument(
    name = "handler::course_access",
    skip(app_state, path, auth_user),
    fields(user_id = %auth_user.user.id, course_id = %path.as_ref())
)]
pub async fn course_access_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let course_id = parse_course_id(path.into_inner())?;
  let has_access = app_state.reconciliation.has_access(&auth_user.user.id, &course_id).await?;
  Ok(HttpResponse::Ok().json(json!({
      "courseId": course_id,
      "hasAccess": has_access
  })))
}
