// coursepay/src/granter.rs

use crate::error::CheckoutError;
use crate::ledger::LedgerStore;
use crate::model::{CourseId, SaleStatus, UserId};
use crate::reference::ExternalReference;
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
  /// This call created the enrollment. `sale_updated` is false when no open
  /// sale could be marked paid; access is granted regardless.
  Granted { sale_updated: bool },
  /// An enrollment already existed, or a concurrent call created it first.
  AlreadyEnrolled,
}

impl GrantOutcome {
  pub fn newly_enrolled(&self) -> bool {
    matches!(self, GrantOutcome::Granted { .. })
  }
}

/// Grants course access at most once per `(user, course)` no matter how many
/// return visits, syncs or concurrent requests ask for it.
#[derive(Clone)]
pub struct EnrollmentGranter {
  ledger: Arc<dyn LedgerStore>,
}

impl EnrollmentGranter {
  pub fn new(ledger: Arc<dyn LedgerStore>) -> Self {
    Self { ledger }
  }

  /// Enrolls the reference's user in its course and marks the sale the
  /// payment was made against as paid. References without a sale id fall back
  /// to the newest open sale of the pair.
  #[instrument(
    name = "EnrollmentGranter::grant",
    skip(self, reference),
    fields(user_id = %reference.user_id(), course_id = %reference.course_id()),
    err(Display)
  )]
  pub async fn grant(&self, reference: &ExternalReference, payment_id: &str) -> Result<GrantOutcome, CheckoutError> {
    let (user_id, course_id) = (reference.user_id(), reference.course_id());
    if self.ledger.find_enrollment(user_id, course_id).await?.is_some() {
      info!("User already enrolled, nothing to grant.");
      return Ok(GrantOutcome::AlreadyEnrolled);
    }

    // The read above is only a fast path. The conditional insert is what
    // decides the winner when two grants race.
    if !self.ledger.insert_enrollment_if_absent(user_id, course_id).await? {
      info!("Enrollment was created concurrently by another request.");
      return Ok(GrantOutcome::AlreadyEnrolled);
    }
    info!("Enrollment created.");

    // Access is already granted; a stale sale row is a bookkeeping problem,
    // not a reason to fail the buyer.
    let sale_updated = match self
      .ledger
      .advance_sale(user_id, course_id, reference.sale_id(), SaleStatus::Paid, Some(payment_id))
      .await
    {
      Ok(Some(sale)) => {
        info!(sale_id = %sale.id, "Sale marked paid.");
        true
      }
      Ok(None) => {
        warn!(sale_id = ?reference.sale_id(), "No open sale to mark paid for this enrollment.");
        false
      }
      Err(e) => {
        warn!(error = %e, "Enrollment granted but the sale could not be marked paid.");
        false
      }
    };

    Ok(GrantOutcome::Granted { sale_updated })
  }

  pub async fn has_access(&self, user_id: &UserId, course_id: &CourseId) -> Result<bool, CheckoutError> {
    Ok(self.ledger.find_enrollment(user_id, course_id).await?.is_some())
  }
}
