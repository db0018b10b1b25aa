// src/lib.rs

//! coursepay: payment reconciliation for a course marketplace.
//!
//! Buyers are sent to a payment gateway to pay for a course and come back
//! (or don't). This crate turns whatever the gateway says into at most one
//! enrollment per user and course:
//!  - Checkout: create a gateway intent, record the attempt, hand back a redirect.
//!  - Return: verify the payment id with the gateway, check it belongs to the
//!    signed-in user, grant access.
//!  - Sync: scan recent gateway transactions and grant anything missed.
//!
//! Each flow is a pipeline of named async steps over a shared context. Storage
//! sits behind `LedgerStore` and the gateway behind `PaymentGateway`.

pub mod error;
pub mod gateway;
pub mod granter;
pub mod ledger;
pub mod model;
pub mod pipeline;
pub mod pipelines;
pub mod reconciliation;
pub mod reference;

// --- Re-exports for the Public API ---

pub use crate::error::{CheckoutError, CheckoutResult, PipelineError};
pub use crate::gateway::{
  GatewayIntent, GatewayKind, GatewaySettings, IntentRequest, MerchantRedirectGateway, PaymentGateway,
  PreferenceGateway, ReturnUrls,
};
pub use crate::granter::{EnrollmentGranter, GrantOutcome};
pub use crate::ledger::{LedgerStore, MemoryLedger};
pub use crate::model::{
  Course, CourseId, Enrollment, GatewayTransaction, IdError, NewSale, PaymentStatus, Sale, SaleStatus, SessionContext,
  SessionUser, UserId, VerifiedPayment,
};
pub use crate::pipeline::{ContextData, Pipeline, PipelineControl, PipelineResult};
pub use crate::pipelines::{CheckoutRedirect, ReturnOutcome, ReturnParams, SyncReport, UnresolvedReason};
pub use crate::reconciliation::{ReconcileSettings, Reconciliation, DEFAULT_SYNC_LOOKBACK};
pub use crate::reference::{ExternalReference, ReferenceParseError};

/// URL type used across the public API.
pub use reqwest::Url;
