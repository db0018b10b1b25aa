// coursepay/src/model/enrollment.rs

use super::{CourseId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access grant. At most one exists per `(user_id, course_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
  pub user_id: UserId,
  pub course_id: CourseId,
  pub created_at: DateTime<Utc>,
}
