// apps/marketplace_app/src/models/sale.rs

use chrono::{DateTime, Utc};
use coursepay::{CourseId, IdError, Sale, SaleStatus, UserId};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

// Matches sale_status_enum in schema.sql.
#[derive(Debug, Clone, Copy, PartialEq, Eq, SqlxType)]
#[sqlx(type_name = "sale_status_enum", rename_all = "lowercase")]
pub enum SaleStatusColumn {
  Started,
  Pending,
  Paid,
  Failed,
}

impl From<SaleStatus> for SaleStatusColumn {
  fn from(status: SaleStatus) -> Self {
    match status {
      SaleStatus::Started => SaleStatusColumn::Started,
      SaleStatus::Pending => SaleStatusColumn::Pending,
      SaleStatus::Paid => SaleStatusColumn::Paid,
      SaleStatus::Failed => SaleStatusColumn::Failed,
    }
  }
}

impl From<SaleStatusColumn> for SaleStatus {
  fn from(column: SaleStatusColumn) -> Self {
    match column {
      SaleStatusColumn::Started => SaleStatus::Started,
      SaleStatusColumn::Pending => SaleStatus::Pending,
      SaleStatusColumn::Paid => SaleStatus::Paid,
      SaleStatusColumn::Failed => SaleStatus::Failed,
    }
  }
}

#[derive(Debug, Clone, FromRow)]
pub struct SaleRow {
  pub id: Uuid,
  pub user_id: String,
  pub course_id: String,
  pub amount_cents: i64,
  pub currency: String,
  pub status: SaleStatusColumn,
  pub gateway_preference_id: String,
  pub gateway_payment_id: Option<String>,
  pub created_at: DateTime<Utc>,
}

impl TryFrom<SaleRow> for Sale {
  type Error = IdError;

  fn try_from(row: SaleRow) -> Result<Self, Self::Error> {
    Ok(Sale {
      id: row.id,
      user_id: UserId::new(row.user_id)?,
      course_id: CourseId::new(row.course_id)?,
      amount_cents: row.amount_cents,
      currency: row.currency,
      status: row.status.into(),
      gateway_preference_id: row.gateway_preference_id,
      gateway_payment_id: row.gateway_payment_id,
      created_at: row.created_at,
    })
  }
}
