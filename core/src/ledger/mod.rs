// coursepay/src/ledger/mod.rs

//! Persistence port for sales and enrollments. The core only talks to
//! `LedgerStore`; the web app provides the Postgres adapter and tests use
//! `MemoryLedger`.

pub mod memory;

pub use memory::MemoryLedger;

use crate::error::CheckoutError;
use crate::model::{CourseId, Enrollment, NewSale, Sale, SaleStatus, UserId};
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait LedgerStore: Send + Sync {
  /// Records a checkout attempt with status `Started`.
  async fn insert_sale(&self, sale: NewSale) -> Result<Sale, CheckoutError>;

  /// Moves one sale of `(user_id, course_id)` to `to`.
  ///
  /// With `sale_id`, only that sale is considered, and only if it belongs to
  /// the pair. Without it, the newest sale whose status may legally transition
  /// is chosen. Returns `None` when there is no such sale or it cannot move.
  /// `payment_id`, when given, is stored on the updated row.
  async fn advance_sale(
    &self,
    user_id: &UserId,
    course_id: &CourseId,
    sale_id: Option<Uuid>,
    to: SaleStatus,
    payment_id: Option<&str>,
  ) -> Result<Option<Sale>, CheckoutError>;

  async fn find_enrollment(&self, user_id: &UserId, course_id: &CourseId) -> Result<Option<Enrollment>, CheckoutError>;

  /// Inserts the enrollment unless one already exists. Returns `true` only for
  /// the call that created the row, including under concurrent callers.
  async fn insert_enrollment_if_absent(&self, user_id: &UserId, course_id: &CourseId) -> Result<bool, CheckoutError>;

  /// Newest first.
  async fn list_enrollments(&self, user_id: &UserId) -> Result<Vec<Enrollment>, CheckoutError>;

  /// Newest first.
  async fn list_sales(&self, user_id: &UserId) -> Result<Vec<Sale>, CheckoutError>;
}
