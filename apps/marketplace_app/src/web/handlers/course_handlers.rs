// apps/marketplace_app/src/web/handlers/course_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument, warn};

use super::parse_course_id;
use crate::db::catalog;
use crate::errors::AppError;
use crate::state::AppState;

#[instrument(name = "handler::list_courses", skip(app_state))]
pub async fn list_courses_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let courses = catalog::list_courses(&app_state.db_pool).await?;
  info!("Successfully fetched {} courses.", courses.len());

  Ok(HttpResponse::Ok().json(json!({
      "message": "Courses fetched successfully.",
      "courses": courses
  })))
}

#[instrument(name = "handler::get_course", skip(app_state, path), fields(course_id = %path.as_ref()))]
pub async fn get_course_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let course_id = parse_course_id(path.into_inner())?;

  match catalog::find_course(&app_state.db_pool, &course_id).await? {
    Some(course) => Ok(HttpResponse::Ok().json(json!({
        "message": "Course fetched successfully.",
        "course": course,
        "priceDisplay": course.price_decimal()
    }))),
    None => {
      warn!("Course with ID {} not found.", course_id);
      Err(AppError::NotFound(format!("Course with ID {} not found.", course_id)))
    }
  }
}
