// coursepay/src/model/sale.rs

use super::{CourseId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle of a checkout attempt.
///
/// `Started -> Pending | Paid | Failed`, `Pending -> Paid | Failed`.
/// `Paid` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
  Started,
  Pending,
  Paid,
  Failed,
}

impl SaleStatus {
  pub const ALL: [SaleStatus; 4] = [SaleStatus::Started, SaleStatus::Pending, SaleStatus::Paid, SaleStatus::Failed];

  pub fn as_str(&self) -> &'static str {
    match self {
      SaleStatus::Started => "started",
      SaleStatus::Pending => "pending",
      SaleStatus::Paid => "paid",
      SaleStatus::Failed => "failed",
    }
  }

  pub fn is_terminal(&self) -> bool {
    matches!(self, SaleStatus::Paid | SaleStatus::Failed)
  }

  pub fn can_transition_to(&self, next: SaleStatus) -> bool {
    matches!(
      (self, next),
      (SaleStatus::Started, SaleStatus::Pending)
        | (SaleStatus::Started, SaleStatus::Paid)
        | (SaleStatus::Started, SaleStatus::Failed)
        | (SaleStatus::Pending, SaleStatus::Paid)
        | (SaleStatus::Pending, SaleStatus::Failed)
    )
  }

  /// Statuses a sale may be in for a move to `target` to be legal.
  pub fn sources_for(target: SaleStatus) -> Vec<SaleStatus> {
    SaleStatus::ALL
      .into_iter()
      .filter(|from| from.can_transition_to(target))
      .collect()
  }
}

impl fmt::Display for SaleStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for SaleStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "started" => Ok(SaleStatus::Started),
      "pending" => Ok(SaleStatus::Pending),
      "paid" => Ok(SaleStatus::Paid),
      "failed" => Ok(SaleStatus::Failed),
      other => Err(format!("unknown sale status '{}'", other)),
    }
  }
}

/// One checkout attempt. Abandoned attempts stay in the ledger as `Started`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
  pub id: Uuid,
  pub user_id: UserId,
  pub course_id: CourseId,
  pub amount_cents: i64,
  pub currency: String,
  pub status: SaleStatus,
  /// Intent id returned by the gateway when the attempt began.
  pub gateway_preference_id: String,
  /// Set once a payment has been verified against this sale.
  pub gateway_payment_id: Option<String>,
  pub created_at: DateTime<Utc>,
}

/// Insert payload for a sale. The id is chosen by the caller because it is
/// embedded in the external reference before the row exists.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSale {
  pub id: Uuid,
  pub user_id: UserId,
  pub course_id: CourseId,
  pub amount_cents: i64,
  pub currency: String,
  pub gateway_preference_id: String,
}
