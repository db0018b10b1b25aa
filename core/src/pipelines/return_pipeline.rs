// coursepay/src/pipelines/return_pipeline.rs

//! Handles the buyer's arrival back from the gateway. The query string is only
//! a hint: every decision is taken on the status the gateway reports for the
//! payment id.

use crate::error::{CheckoutError, PipelineError};
use crate::gateway::merchant_redirect;
use crate::model::{CourseId, PaymentStatus, SaleStatus};
use crate::model::payment::non_blank;
use crate::pipeline::{ContextData, Pipeline, PipelineControl};
use crate::pipelines::contexts::ReturnCtxData;
use crate::reference::{ExternalReference, ReferenceParseError};
use tracing::{debug, info, warn};

/// Payment id and status as they appear on the return URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReturnParams {
  pub payment_id: Option<String>,
  pub status_hint: Option<PaymentStatus>,
}

impl ReturnParams {
  pub fn new(payment_id: impl Into<String>) -> Self {
    Self {
      payment_id: non_blank(Some(payment_id.into())),
      status_hint: None,
    }
  }

  pub fn with_status_hint(mut self, status: PaymentStatus) -> Self {
    self.status_hint = Some(status);
    self
  }

  /// Reads the return query. Accepts `payment_id` or `collection_id` (preference
  /// gateway) and `tx` (redirect gateway) for the id, and `status`,
  /// `collection_status` or `st` for the hint. Blank and "null" values are absent.
  pub fn from_pairs<I, K, V>(pairs: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
  {
    let mut ids: [Option<String>; 3] = [None, None, None];
    let mut statuses: [Option<PaymentStatus>; 3] = [None, None, None];

    for (key, value) in pairs {
      let value = non_blank(Some(value.as_ref().to_string()));
      match key.as_ref() {
        "payment_id" => ids[0] = ids[0].take().or(value),
        "collection_id" => ids[1] = ids[1].take().or(value),
        "tx" => ids[2] = ids[2].take().or(value),
        "status" => statuses[0] = statuses[0].take().or(value.map(|v| PaymentStatus::parse(&v))),
        "collection_status" => statuses[1] = statuses[1].take().or(value.map(|v| PaymentStatus::parse(&v))),
        "st" => statuses[2] = statuses[2].take().or(value.map(|v| merchant_redirect::map_status(&v))),
        _ => {}
      }
    }

    Self {
      payment_id: ids.into_iter().flatten().next(),
      status_hint: statuses.into_iter().flatten().next(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedReason {
  /// The gateway reports a status other than approved or awaiting approval.
  NotApproved,
  /// Approved, but the payment carries no external reference.
  MissingReference,
  /// Approved, but the external reference could not be parsed.
  MalformedReference(ReferenceParseError),
}

/// Where the return page ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnOutcome {
  /// No payment id on the return URL.
  Idle,
  Confirmed {
    payment_id: String,
    course_id: CourseId,
    newly_enrolled: bool,
  },
  AwaitingApproval {
    payment_id: String,
    status: PaymentStatus,
  },
  Unresolved {
    payment_id: String,
    status: PaymentStatus,
    reason: UnresolvedReason,
  },
}

impl ReturnOutcome {
  pub fn state_name(&self) -> &'static str {
    match self {
      ReturnOutcome::Idle => "idle",
      ReturnOutcome::Confirmed { .. } => "confirmed",
      ReturnOutcome::AwaitingApproval { .. } => "awaiting_approval",
      ReturnOutcome::Unresolved { .. } => "unresolved",
    }
  }

  /// The payment parameters should be removed from the visible URL so a
  /// reload does not replay the return.
  pub fn clears_query(&self) -> bool {
    matches!(self, ReturnOutcome::Confirmed { .. })
  }

  pub fn offers_sync(&self) -> bool {
    matches!(self, ReturnOutcome::AwaitingApproval { .. } | ReturnOutcome::Unresolved { .. })
  }

  pub fn payment_id(&self) -> Option<&str> {
    match self {
      ReturnOutcome::Idle => None,
      ReturnOutcome::Confirmed { payment_id, .. }
      | ReturnOutcome::AwaitingApproval { payment_id, .. }
      | ReturnOutcome::Unresolved { payment_id, .. } => Some(payment_id),
    }
  }

  pub fn advisory(&self) -> Option<String> {
    match self {
      ReturnOutcome::Idle => None,
      ReturnOutcome::Confirmed { newly_enrolled: true, .. } => Some("Payment confirmed. Your course is unlocked.".to_string()),
      ReturnOutcome::Confirmed { newly_enrolled: false, .. } => {
        Some("Payment confirmed. You already have access to this course.".to_string())
      }
      ReturnOutcome::AwaitingApproval { .. } => Some(
        "Your payment is being processed. The course unlocks once it is approved; use \"Sync purchases\" to check again later."
          .to_string(),
      ),
      ReturnOutcome::Unresolved {
        status,
        reason: UnresolvedReason::NotApproved,
        ..
      } => Some(format!(
        "Your payment was not approved (status: {}). You can try again, or use \"Sync purchases\" if you were charged.",
        status
      )),
      ReturnOutcome::Unresolved { .. } => {
        Some("We could not match this payment to a course. Use \"Sync purchases\" or contact support.".to_string())
      }
    }
  }
}

pub fn build_return_pipeline() -> Pipeline<ReturnCtxData, CheckoutError> {
  let mut pipeline = Pipeline::new(&[
    ("read_return_params", false),
    ("verify_payment", false),
    ("check_ownership", false),
    ("grant_enrollment", false),
    ("settle_ledger", true),
  ]);

  pipeline.on_root("read_return_params", read_return_params);
  pipeline.on_root("verify_payment", verify_payment);
  pipeline.on_root("check_ownership", check_ownership);
  pipeline.on_root("grant_enrollment", grant_enrollment);
  pipeline.on_root("settle_ledger", settle_ledger);

  pipeline
}

async fn read_return_params(ctx_data: ContextData<ReturnCtxData>) -> Result<PipelineControl, CheckoutError> {
  let (payment_id, signed_in) = {
    let guard = ctx_data.read();
    (guard.params.payment_id.clone(), guard.session.user.is_some())
  };

  match payment_id {
    None => {
      debug!("Return carries no payment id, nothing to reconcile.");
      ctx_data.write().outcome = Some(ReturnOutcome::Idle);
      Ok(PipelineControl::Stop)
    }
    Some(_) if !signed_in => Err(CheckoutError::Unauthenticated),
    Some(payment_id) => {
      info!(payment_id = %payment_id, "Reconciling gateway return.");
      Ok(PipelineControl::Continue)
    }
  }
}

async fn verify_payment(ctx_data: ContextData<ReturnCtxData>) -> Result<PipelineControl, CheckoutError> {
  let (gateway, payment_id) = {
    let guard = ctx_data.read();
    let payment_id = guard.params.payment_id.clone().ok_or(PipelineError::MissingContextValue {
      step_name: "verify_payment",
      field: "params.payment_id",
    })?;
    (guard.services.gateway.clone(), payment_id)
  };

  let verified = gateway.verify_status(&payment_id).await?;
  info!(payment_id = %payment_id, status = %verified.status, "Gateway reported payment status.");

  ctx_data.write().verified = Some(verified);
  Ok(PipelineControl::Continue)
}

async fn check_ownership(ctx_data: ContextData<ReturnCtxData>) -> Result<PipelineControl, CheckoutError> {
  let mut guard = ctx_data.write();
  let verified = guard.verified.clone().ok_or(PipelineError::MissingContextValue {
    step_name: "check_ownership",
    field: "verified",
  })?;
  let session_user = guard.session.require_user()?.id.clone();
  let parsed = verified.external_reference.as_deref().map(ExternalReference::parse);
  let payment_id = verified.payment_id.clone();

  if verified.approved() {
    let reference = match parsed {
      None => {
        warn!(payment_id = %payment_id, "Approved payment has no external reference.");
        guard.outcome = Some(ReturnOutcome::Unresolved {
          payment_id,
          status: verified.status,
          reason: UnresolvedReason::MissingReference,
        });
        return Ok(PipelineControl::Stop);
      }
      Some(Err(e)) => {
        warn!(payment_id = %payment_id, error = %e, "Approved payment has a malformed external reference.");
        guard.outcome = Some(ReturnOutcome::Unresolved {
          payment_id,
          status: verified.status,
          reason: UnresolvedReason::MalformedReference(e),
        });
        return Ok(PipelineControl::Stop);
      }
      Some(Ok(reference)) => reference,
    };

    if !reference.belongs_to(&session_user) {
      warn!(
        payment_id = %payment_id,
        reference_user = %reference.user_id(),
        session_user = %session_user,
        "Approved payment belongs to another user."
      );
      return Err(CheckoutError::OwnershipMismatch {
        payment_id,
        reference_user: reference.user_id().clone(),
        session_user,
      });
    }

    guard.reference = Some(reference);
    return Ok(PipelineControl::Continue);
  }

  // Only an approved verified status grants. A pending hint from the return
  // URL keeps the buyer waiting even when the gateway answers otherwise.
  let hint_awaiting = guard.params.status_hint.as_ref().is_some_and(PaymentStatus::is_awaiting);
  guard.outcome = Some(if verified.status.is_awaiting() || hint_awaiting {
    ReturnOutcome::AwaitingApproval {
      payment_id,
      status: verified.status.clone(),
    }
  } else {
    ReturnOutcome::Unresolved {
      payment_id,
      status: verified.status.clone(),
      reason: UnresolvedReason::NotApproved,
    }
  });

  if let Some(Ok(reference)) = parsed {
    if reference.belongs_to(&session_user) {
      guard.reference = Some(reference);
    }
  }
  Ok(PipelineControl::Continue)
}

async fn grant_enrollment(ctx_data: ContextData<ReturnCtxData>) -> Result<PipelineControl, CheckoutError> {
  let (granter, reference, payment_id) = {
    let guard = ctx_data.read();
    if guard.outcome.is_some() {
      // Not approved; nothing to grant.
      return Ok(PipelineControl::Continue);
    }
    let reference = guard.reference.clone().ok_or(PipelineError::MissingContextValue {
      step_name: "grant_enrollment",
      field: "reference",
    })?;
    let payment_id = guard.params.payment_id.clone().unwrap_or_default();
    (guard.services.granter.clone(), reference, payment_id)
  };

  let grant = granter.grant(&reference, &payment_id).await?;

  ctx_data.write().outcome = Some(ReturnOutcome::Confirmed {
    payment_id,
    course_id: reference.course_id().clone(),
    newly_enrolled: grant.newly_enrolled(),
  });
  Ok(PipelineControl::Continue)
}

/// Records a pending or declined payment against the buyer's open sale.
/// Bookkeeping only: a failure here never changes what the buyer sees.
async fn settle_ledger(ctx_data: ContextData<ReturnCtxData>) -> Result<PipelineControl, CheckoutError> {
  let (ledger, reference, target, payment_id) = {
    let guard = ctx_data.read();
    let target = match &guard.outcome {
      Some(ReturnOutcome::AwaitingApproval { .. }) => Some(SaleStatus::Pending),
      Some(ReturnOutcome::Unresolved {
        status,
        reason: UnresolvedReason::NotApproved,
        ..
      }) if status.is_declined() => Some(SaleStatus::Failed),
      _ => None,
    };
    (
      guard.services.ledger.clone(),
      guard.reference.clone(),
      target,
      guard.params.payment_id.clone(),
    )
  };

  let (Some(target), Some(reference)) = (target, reference) else {
    return Ok(PipelineControl::Continue);
  };

  match ledger
    .advance_sale(
      reference.user_id(),
      reference.course_id(),
      reference.sale_id(),
      target,
      payment_id.as_deref(),
    )
    .await?
  {
    Some(sale) => info!(sale_id = %sale.id, status = %sale.status, "Sale status updated from gateway return."),
    None => debug!(target = %target, "No open sale to update from gateway return."),
  }
  Ok(PipelineControl::Continue)
}
