// apps/marketplace_app/src/web/handlers/mod.rs

// Declare handler modules
pub mod checkout_handlers;
pub mod course_handlers;
pub mod purchase_handlers;

use coursepay::CourseId;

use crate::errors::AppError;

/// Course ids arrive as path segments; reject ones that could not be embedded
/// in an external reference before touching the database.
pub(crate) fn parse_course_id(raw: String) -> Result<CourseId, AppError> {
  CourseId::new(raw).map_err(|e| AppError::Validation(e.to_string()))
}
