// apps/marketplace_app/src/db/ledger_store.rs

use async_trait::async_trait;
use coursepay::{CheckoutError, CourseId, Enrollment, LedgerStore, NewSale, Sale, SaleStatus, UserId};
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::models::{EnrollmentRow, SaleRow, SaleStatusColumn};

const SALE_COLUMNS: &str =
  "id, user_id, course_id, amount_cents, currency, status, gateway_preference_id, gateway_payment_id, created_at";

/// `LedgerStore` over the `sales` and `enrollments` tables in schema.sql.
///
/// The enrollment primary key `(user_id, course_id)` is what makes grants
/// exactly-once: concurrent inserts race on the constraint and only one of
/// them reports a created row.
#[derive(Clone)]
pub struct PgLedgerStore {
  pool: PgPool,
}

impl PgLedgerStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

fn sale_from_row(operation: &'static str, row: SaleRow) -> Result<Sale, CheckoutError> {
  Sale::try_from(row).map_err(|e| CheckoutError::ledger_read(operation, e))
}

fn enrollment_from_row(operation: &'static str, row: EnrollmentRow) -> Result<Enrollment, CheckoutError> {
  Enrollment::try_from(row).map_err(|e| CheckoutError::ledger_read(operation, e))
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
  #[instrument(name = "PgLedgerStore::insert_sale", skip(self, sale), fields(sale_id = %sale.id))]
  async fn insert_sale(&self, sale: NewSale) -> Result<Sale, CheckoutError> {
    let query = format!(
      "INSERT INTO sales (id, user_id, course_id, amount_cents, currency, status, gateway_preference_id) \
       VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
      SALE_COLUMNS
    );
    let row: SaleRow = sqlx::query_as(&query)
      .bind(sale.id)
      .bind(sale.user_id.as_str())
      .bind(sale.course_id.as_str())
      .bind(sale.amount_cents)
      .bind(&sale.currency)
      .bind(SaleStatusColumn::Started)
      .bind(&sale.gateway_preference_id)
      .fetch_one(&self.pool)
      .await
      .map_err(|e| CheckoutError::ledger_write("insert_sale", e))?;
    sale_from_row("insert_sale", row)
  }

  #[instrument(
    name = "PgLedgerStore::advance_sale",
    skip(self, user_id, course_id),
    fields(user_id = %user_id, course_id = %course_id, sale_id = ?sale_id)
  )]
  async fn advance_sale(
    &self,
    user_id: &UserId,
    course_id: &CourseId,
    sale_id: Option<Uuid>,
    to: SaleStatus,
    payment_id: Option<&str>,
  ) -> Result<Option<Sale>, CheckoutError> {
    let sources: Vec<String> = SaleStatus::sources_for(to)
      .into_iter()
      .map(|status| status.as_str().to_string())
      .collect();
    // Row lock in the subselect; a concurrent transition re-checks the status
    // and skips the row if it has already moved.
    let query = format!(
      "UPDATE sales SET status = $4, gateway_payment_id = COALESCE($5, gateway_payment_id), updated_at = now() \
       WHERE id = ( \
         SELECT id FROM sales \
         WHERE user_id = $1 AND course_id = $2 AND status::text = ANY($3) \
           AND ($6::uuid IS NULL OR id = $6) \
         ORDER BY created_at DESC \
         LIMIT 1 \
         FOR UPDATE \
       ) RETURNING {}",
      SALE_COLUMNS
    );
    let row: Option<SaleRow> = sqlx::query_as(&query)
      .bind(user_id.as_str())
      .bind(course_id.as_str())
      .bind(&sources)
      .bind(SaleStatusColumn::from(to))
      .bind(payment_id)
      .bind(sale_id)
      .fetch_optional(&self.pool)
      .await
      .map_err(|e| CheckoutError::ledger_write("advance_sale", e))?;
    if row.is_none() {
      debug!(to = %to, "No sale eligible for transition.");
    }
    row.map(|r| sale_from_row("advance_sale", r)).transpose()
  }

  async fn find_enrollment(&self, user_id: &UserId, course_id: &CourseId) -> Result<Option<Enrollment>, CheckoutError> {
    let row: Option<EnrollmentRow> =
      sqlx::query_as("SELECT user_id, course_id, created_at FROM enrollments WHERE user_id = $1 AND course_id = $2")
        .bind(user_id.as_str())
        .bind(course_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CheckoutError::ledger_read("find_enrollment", e))?;
    row.map(|r| enrollment_from_row("find_enrollment", r)).transpose()
  }

  #[instrument(name = "PgLedgerStore::insert_enrollment_if_absent", skip(self, user_id, course_id), fields(user_id = %user_id, course_id = %course_id))]
  async fn insert_enrollment_if_absent(&self, user_id: &UserId, course_id: &CourseId) -> Result<bool, CheckoutError> {
    let result = sqlx::query(
      "INSERT INTO enrollments (user_id, course_id) VALUES ($1, $2) ON CONFLICT (user_id, course_id) DO NOTHING",
    )
    .bind(user_id.as_str())
    .bind(course_id.as_str())
    .execute(&self.pool)
    .await
    .map_err(|e| CheckoutError::ledger_write("insert_enrollment", e))?;
    Ok(result.rows_affected() == 1)
  }

  async fn list_enrollments(&self, user_id: &UserId) -> Result<Vec<Enrollment>, CheckoutError> {
    let rows: Vec<EnrollmentRow> = sqlx::query_as(
      "SELECT user_id, course_id, created_at FROM enrollments WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id.as_str())
    .fetch_all(&self.pool)
    .await
    .map_err(|e| CheckoutError::ledger_read("list_enrollments", e))?;
    rows
      .into_iter()
      .map(|r| enrollment_from_row("list_enrollments", r))
      .collect()
  }

  async fn list_sales(&self, user_id: &UserId) -> Result<Vec<Sale>, CheckoutError> {
    let query = format!(
      "SELECT {} FROM sales WHERE user_id = $1 ORDER BY created_at DESC",
      SALE_COLUMNS
    );
    let rows: Vec<SaleRow> = sqlx::query_as(&query)
      .bind(user_id.as_str())
      .fetch_all(&self.pool)
      .await
      .map_err(|e| CheckoutError::ledger_read("list_sales", e))?;
    rows.into_iter().map(|r| sale_from_row("list_sales", r)).collect()
  }
}
