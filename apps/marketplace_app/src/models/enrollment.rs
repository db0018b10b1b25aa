// apps/marketplace_app/src/models/enrollment.rs

use chrono::{DateTime, Utc};
use coursepay::{CourseId, Enrollment, IdError, UserId};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct EnrollmentRow {
  pub user_id: String,
  pub course_id: String,
  pub created_at: DateTime<Utc>,
}

impl TryFrom<EnrollmentRow> for Enrollment {
  type Error = IdError;

  fn try_from(row: EnrollmentRow) -> Result<Self, Self::Error> {
    Ok(Enrollment {
      user_id: UserId::new(row.user_id)?,
      course_id: CourseId::new(row.course_id)?,
      created_at: row.created_at,
    })
  }
}
