// apps/marketplace_app/src/models/course.rs

use coursepay::{Course, CourseId, IdError};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct CourseRow {
  pub id: String,
  pub title: String,
  pub price_cents: i64,
  pub currency: String,
}

impl TryFrom<CourseRow> for Course {
  type Error = IdError;

  fn try_from(row: CourseRow) -> Result<Self, Self::Error> {
    Ok(Course::new(CourseId::new(row.id)?, row.title, row.price_cents, row.currency))
  }
}
