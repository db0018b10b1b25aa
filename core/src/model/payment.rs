// coursepay/src/model/payment.rs

use chrono::{DateTime, Utc};
use std::fmt;

/// Internal payment status vocabulary. Each gateway adapter maps its own
/// wording onto these values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PaymentStatus {
  Approved,
  Pending,
  InProcess,
  /// Funds reserved but not captured yet.
  Authorized,
  Rejected,
  Cancelled,
  Refunded,
  ChargedBack,
  /// The gateway has no payment under the given id.
  NotFound,
  /// Anything the adapter could not map, kept verbatim for logs.
  Other(String),
}

impl PaymentStatus {
  /// Parses the canonical vocabulary. Case-insensitive; unknown words become `Other`.
  pub fn parse(raw: &str) -> Self {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
      "approved" => PaymentStatus::Approved,
      "pending" => PaymentStatus::Pending,
      "in_process" => PaymentStatus::InProcess,
      "authorized" => PaymentStatus::Authorized,
      "rejected" => PaymentStatus::Rejected,
      "cancelled" | "canceled" => PaymentStatus::Cancelled,
      "refunded" => PaymentStatus::Refunded,
      "charged_back" => PaymentStatus::ChargedBack,
      "not_found" => PaymentStatus::NotFound,
      _ => PaymentStatus::Other(raw.trim().to_string()),
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      PaymentStatus::Approved => "approved",
      PaymentStatus::Pending => "pending",
      PaymentStatus::InProcess => "in_process",
      PaymentStatus::Authorized => "authorized",
      PaymentStatus::Rejected => "rejected",
      PaymentStatus::Cancelled => "cancelled",
      PaymentStatus::Refunded => "refunded",
      PaymentStatus::ChargedBack => "charged_back",
      PaymentStatus::NotFound => "not_found",
      PaymentStatus::Other(raw) => raw.as_str(),
    }
  }

  pub fn is_approved(&self) -> bool {
    matches!(self, PaymentStatus::Approved)
  }

  /// The payer may still complete this payment without starting a new checkout.
  pub fn is_awaiting(&self) -> bool {
    matches!(self, PaymentStatus::Pending | PaymentStatus::InProcess | PaymentStatus::Authorized)
  }

  /// The attempt is over and no money moved.
  pub fn is_declined(&self) -> bool {
    matches!(self, PaymentStatus::Rejected | PaymentStatus::Cancelled)
  }
}

impl fmt::Display for PaymentStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Authoritative answer from the gateway about one payment.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedPayment {
  pub payment_id: String,
  pub status: PaymentStatus,
  pub external_reference: Option<String>,
}

impl VerifiedPayment {
  pub fn approved(&self) -> bool {
    self.status.is_approved()
  }
}

/// One entry from the gateway's recent-transactions listing.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayTransaction {
  pub id: String,
  pub status: PaymentStatus,
  pub transaction_amount: Option<f64>,
  pub payer_email: Option<String>,
  pub external_reference: Option<String>,
  pub date_created: Option<DateTime<Utc>>,
}

/// Empty strings and the literal "null" both mean "absent" in gateway payloads
/// and return query strings.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
  value.and_then(|v| {
    let trimmed = v.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
      None
    } else {
      Some(trimmed.to_string())
    }
  })
}
