// coursepay/src/gateway/dto.rs

//! Wire shapes for the gateway APIs. Kept apart from the domain model so a
//! field rename on the provider side stays local to this file.

use crate::model::payment::non_blank;
use crate::model::{GatewayTransaction, PaymentStatus, VerifiedPayment};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Preference gateway: create ---

#[derive(Debug, Serialize)]
pub(crate) struct PreferenceRequestDto<'a> {
  pub items: Vec<PreferenceItemDto<'a>>,
  pub payer: PayerDto<'a>,
  pub back_urls: BackUrlsDto<'a>,
  pub auto_return: &'static str,
  pub external_reference: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct PreferenceItemDto<'a> {
  pub id: &'a str,
  pub title: &'a str,
  pub quantity: u32,
  pub unit_price: f64,
  pub currency_id: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct PayerDto<'a> {
  pub email: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct BackUrlsDto<'a> {
  pub success: &'a str,
  pub failure: &'a str,
  pub pending: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PreferenceResponseDto {
  pub id: String,
  #[serde(default)]
  pub init_point: Option<String>,
  #[serde(default)]
  pub sandbox_init_point: Option<String>,
}

// --- Payments: lookup and search ---

/// Payment ids arrive as JSON numbers from one provider and strings from another.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawId {
  Number(u64),
  Text(String),
}

impl RawId {
  pub fn into_string(self) -> String {
    match self {
      RawId::Number(n) => n.to_string(),
      RawId::Text(s) => s,
    }
  }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PaymentDto {
  pub id: RawId,
  pub status: String,
  #[serde(default)]
  pub transaction_amount: Option<f64>,
  #[serde(default)]
  pub payer: Option<PaymentPayerDto>,
  #[serde(default)]
  pub external_reference: Option<String>,
  #[serde(default)]
  pub date_created: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PaymentPayerDto {
  #[serde(default)]
  pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PaymentSearchDto {
  #[serde(default)]
  pub results: Vec<PaymentDto>,
}

impl PaymentDto {
  pub fn into_verified(self, map_status: fn(&str) -> PaymentStatus) -> VerifiedPayment {
    VerifiedPayment {
      payment_id: self.id.into_string(),
      status: map_status(&self.status),
      external_reference: non_blank(self.external_reference),
    }
  }

  pub fn into_transaction(self, map_status: fn(&str) -> PaymentStatus) -> GatewayTransaction {
    GatewayTransaction {
      id: self.id.into_string(),
      status: map_status(&self.status),
      transaction_amount: self.transaction_amount,
      payer_email: non_blank(self.payer.and_then(|p| p.email)),
      external_reference: non_blank(self.external_reference),
      date_created: self.date_created,
    }
  }
}

// --- Merchant redirect verifier ---

#[derive(Debug, Deserialize)]
pub(crate) struct VerifierTransactionDto {
  pub id: RawId,
  pub status: String,
  #[serde(default)]
  pub amount: Option<f64>,
  #[serde(default)]
  pub payer_email: Option<String>,
  /// The `custom` field echoed back by the gateway.
  #[serde(default, alias = "custom")]
  pub external_reference: Option<String>,
  #[serde(default)]
  pub date_created: Option<DateTime<Utc>>,
}

impl VerifierTransactionDto {
  pub fn into_verified(self, map_status: fn(&str) -> PaymentStatus) -> VerifiedPayment {
    VerifiedPayment {
      payment_id: self.id.into_string(),
      status: map_status(&self.status),
      external_reference: non_blank(self.external_reference),
    }
  }

  pub fn into_transaction(self, map_status: fn(&str) -> PaymentStatus) -> GatewayTransaction {
    GatewayTransaction {
      id: self.id.into_string(),
      status: map_status(&self.status),
      transaction_amount: self.amount,
      payer_email: non_blank(self.payer_email),
      external_reference: non_blank(self.external_reference),
      date_created: self.date_created,
    }
  }
}

/// Newest first, undated entries last, then capped at `limit`.
pub(crate) fn newest_first(mut transactions: Vec<GatewayTransaction>, limit: usize) -> Vec<GatewayTransaction> {
  transactions.sort_by(|a, b| b.date_created.cmp(&a.date_created));
  transactions.truncate(limit);
  transactions
}
