// apps/marketplace_app/src/db/catalog.rs

use coursepay::{Course, CourseId};
use sqlx::PgPool;
use tracing::error;

use crate::errors::{AppError, Result};
use crate::models::CourseRow;

fn into_course(row: CourseRow) -> Result<Course> {
  Course::try_from(row).map_err(|e| AppError::Internal(format!("Stored course has an invalid id: {}", e)))
}

pub async fn list_courses(pool: &PgPool) -> Result<Vec<Course>> {
  let rows: Vec<CourseRow> = sqlx::query_as("SELECT id, title, price_cents, currency FROM courses ORDER BY title ASC")
    .fetch_all(pool)
    .await
    .map_err(|e| {
      error!("Failed to fetch courses from database: {}", e);
      AppError::Sqlx(e)
    })?;
  rows.into_iter().map(into_course).collect()
}

pub async fn find_course(pool: &PgPool, course_id: &CourseId) -> Result<Option<Course>> {
  let row: Option<CourseRow> = sqlx::query_as("SELECT id, title, price_cents, currency FROM courses WHERE id = $1")
    .bind(course_id.as_str())
    .fetch_optional(pool)
    .await
    .map_err(|e| {
      error!("Database error while fetching course {}: {}", course_id, e);
      AppError::Sqlx(e)
    })?;
  row.map(into_course).transpose()
}
