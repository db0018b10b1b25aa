// coursepay/src/ledger/memory.rs

use super::LedgerStore;
use crate::error::CheckoutError;
use crate::model::{CourseId, Enrollment, NewSale, Sale, SaleStatus, UserId};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
  // Insertion order doubles as creation order.
  sales: Vec<Sale>,
  enrollments: Vec<Enrollment>,
}

/// In-process ledger. Every operation runs under one lock, which makes the
/// conditional enrollment insert atomic the same way a unique key does in SQL.
#[derive(Debug, Default)]
pub struct MemoryLedger {
  tables: Mutex<Tables>,
}

impl MemoryLedger {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn sale_count(&self) -> usize {
    self.tables.lock().sales.len()
  }

  pub fn enrollment_count(&self) -> usize {
    self.tables.lock().enrollments.len()
  }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
  async fn insert_sale(&self, sale: NewSale) -> Result<Sale, CheckoutError> {
    let mut tables = self.tables.lock();
    if tables.sales.iter().any(|s| s.id == sale.id) {
      return Err(CheckoutError::ledger_write(
        "insert_sale",
        anyhow::anyhow!("sale {} already exists", sale.id),
      ));
    }
    let row = Sale {
      id: sale.id,
      user_id: sale.user_id,
      course_id: sale.course_id,
      amount_cents: sale.amount_cents,
      currency: sale.currency,
      status: SaleStatus::Started,
      gateway_preference_id: sale.gateway_preference_id,
      gateway_payment_id: None,
      created_at: Utc::now(),
    };
    tables.sales.push(row.clone());
    Ok(row)
  }

  async fn advance_sale(
    &self,
    user_id: &UserId,
    course_id: &CourseId,
    sale_id: Option<Uuid>,
    to: SaleStatus,
    payment_id: Option<&str>,
  ) -> Result<Option<Sale>, CheckoutError> {
    let mut tables = self.tables.lock();
    let candidate = tables
      .sales
      .iter_mut()
      .rev()
      .filter(|s| &s.user_id == user_id && &s.course_id == course_id)
      .filter(|s| sale_id.map_or(true, |id| s.id == id))
      .find(|s| s.status.can_transition_to(to));

    match candidate {
      Some(sale) => {
        debug!(sale_id = %sale.id, from = %sale.status, to = %to, "Advancing sale.");
        sale.status = to;
        if let Some(id) = payment_id {
          sale.gateway_payment_id = Some(id.to_string());
        }
        Ok(Some(sale.clone()))
      }
      None => Ok(None),
    }
  }

  async fn find_enrollment(&self, user_id: &UserId, course_id: &CourseId) -> Result<Option<Enrollment>, CheckoutError> {
    let tables = self.tables.lock();
    Ok(
      tables
        .enrollments
        .iter()
        .find(|e| &e.user_id == user_id && &e.course_id == course_id)
        .cloned(),
    )
  }

  async fn insert_enrollment_if_absent(&self, user_id: &UserId, course_id: &CourseId) -> Result<bool, CheckoutError> {
    let mut tables = self.tables.lock();
    if tables
      .enrollments
      .iter()
      .any(|e| &e.user_id == user_id && &e.course_id == course_id)
    {
      return Ok(false);
    }
    tables.enrollments.push(Enrollment {
      user_id: user_id.clone(),
      course_id: course_id.clone(),
      created_at: Utc::now(),
    });
    Ok(true)
  }

  async fn list_enrollments(&self, user_id: &UserId) -> Result<Vec<Enrollment>, CheckoutError> {
    let tables = self.tables.lock();
    Ok(tables.enrollments.iter().rev().filter(|e| &e.user_id == user_id).cloned().collect())
  }

  async fn list_sales(&self, user_id: &UserId) -> Result<Vec<Sale>, CheckoutError> {
    let tables = self.tables.lock();
    Ok(tables.sales.iter().rev().filter(|s| &s.user_id == user_id).cloned().collect())
  }
}
