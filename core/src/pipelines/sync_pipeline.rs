// coursepay/src/pipelines/sync_pipeline.rs

//! "Sync purchases": scans the gateway's recent transactions and grants any
//! approved purchase of the signed-in user that was never enrolled, for
//! instance because the buyer closed the tab before the return page loaded.

use crate::error::CheckoutError;
use crate::granter::{EnrollmentGranter, GrantOutcome};
use crate::model::{CourseId, GatewayTransaction, UserId};
use crate::pipeline::{ContextData, Pipeline, PipelineControl};
use crate::pipelines::contexts::SyncCtxData;
use crate::reference::ExternalReference;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Tally of one scan. `enrolled` is the number of enrollments this scan created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
  pub scanned: usize,
  pub enrolled: usize,
  pub already_enrolled: usize,
  /// Approved transactions of other users, or with no reference at all.
  pub foreign: usize,
  pub not_approved: usize,
  pub malformed: usize,
  /// Transactions skipped because the ledger failed; a later scan retries them.
  pub failed: usize,
  pub enrolled_courses: Vec<CourseId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Disposition {
  Enrolled(CourseId),
  AlreadyEnrolled,
  Foreign,
  NotApproved,
}

impl SyncReport {
  fn record(&mut self, disposition: Disposition) {
    match disposition {
      Disposition::Enrolled(course_id) => {
        self.enrolled += 1;
        self.enrolled_courses.push(course_id);
      }
      Disposition::AlreadyEnrolled => self.already_enrolled += 1,
      Disposition::Foreign => self.foreign += 1,
      Disposition::NotApproved => self.not_approved += 1,
    }
  }
}

pub fn build_sync_pipeline() -> Pipeline<SyncCtxData, CheckoutError> {
  let mut pipeline = Pipeline::new(&[("fetch_recent_transactions", false), ("reconcile_transactions", false)]);

  pipeline.on_root("fetch_recent_transactions", fetch_recent_transactions);
  pipeline.on_root("reconcile_transactions", reconcile_transactions);

  pipeline
}

async fn fetch_recent_transactions(ctx_data: ContextData<SyncCtxData>) -> Result<PipelineControl, CheckoutError> {
  let (gateway, lookback) = {
    let guard = ctx_data.read();
    (guard.services.gateway.clone(), guard.lookback)
  };

  let transactions = gateway.list_recent_transactions(lookback).await?;
  debug!(count = transactions.len(), lookback, "Fetched recent gateway transactions.");

  let mut guard = ctx_data.write();
  guard.report.scanned = transactions.len();
  guard.transactions = transactions;
  Ok(PipelineControl::Continue)
}

async fn reconcile_transactions(ctx_data: ContextData<SyncCtxData>) -> Result<PipelineControl, CheckoutError> {
  let (granter, user_id, transactions) = {
    let mut guard = ctx_data.write();
    (
      guard.services.granter.clone(),
      guard.user.id.clone(),
      std::mem::take(&mut guard.transactions),
    )
  };

  let mut report = SyncReport {
    scanned: transactions.len(),
    ..SyncReport::default()
  };

  // One bad entry must not stop the scan: tally it and move on.
  for transaction in &transactions {
    match reconcile_one(&granter, &user_id, transaction).await {
      Ok(disposition) => report.record(disposition),
      Err(CheckoutError::Parse(e)) => {
        warn!(transaction_id = %transaction.id, error = %e, "Skipping transaction with a malformed reference.");
        report.malformed += 1;
      }
      Err(e) => {
        warn!(transaction_id = %transaction.id, error = %e, "Skipping transaction that could not be reconciled.");
        report.failed += 1;
      }
    }
  }

  info!(
    scanned = report.scanned,
    enrolled = report.enrolled,
    already_enrolled = report.already_enrolled,
    failed = report.failed,
    "Purchase sync finished."
  );
  ctx_data.write().report = report;
  Ok(PipelineControl::Continue)
}

async fn reconcile_one(
  granter: &EnrollmentGranter,
  user_id: &UserId,
  transaction: &GatewayTransaction,
) -> Result<Disposition, CheckoutError> {
  if !transaction.status.is_approved() {
    return Ok(Disposition::NotApproved);
  }
  let Some(raw) = transaction.external_reference.as_deref() else {
    return Ok(Disposition::Foreign);
  };
  let reference = ExternalReference::parse(raw)?;
  if !reference.belongs_to(user_id) {
    return Ok(Disposition::Foreign);
  }

  match granter.grant(&reference, &transaction.id).await? {
    GrantOutcome::Granted { .. } => {
      info!(transaction_id = %transaction.id, course_id = %reference.course_id(), "Recovered purchase enrolled.");
      Ok(Disposition::Enrolled(reference.course_id().clone()))
    }
    GrantOutcome::AlreadyEnrolled => Ok(Disposition::AlreadyEnrolled),
  }
}
