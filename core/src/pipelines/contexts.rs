// coursepay/src/pipelines/contexts.rs

use crate::gateway::{GatewayIntent, PaymentGateway};
use crate::granter::EnrollmentGranter;
use crate::ledger::LedgerStore;
use crate::model::{Course, GatewayTransaction, Sale, SessionContext, SessionUser, VerifiedPayment};
use crate::pipelines::checkout_pipeline::CheckoutRedirect;
use crate::pipelines::return_pipeline::{ReturnOutcome, ReturnParams};
use crate::pipelines::sync_pipeline::SyncReport;
use crate::reconciliation::ReconcileSettings;
use crate::reference::ExternalReference;
use std::sync::Arc;
use uuid::Uuid;

/// Collaborators every flow step can reach through its context.
#[derive(Clone)]
pub struct FlowServices {
  pub ledger: Arc<dyn LedgerStore>,
  pub gateway: Arc<dyn PaymentGateway>,
  pub granter: EnrollmentGranter,
  pub settings: Arc<ReconcileSettings>,
}

impl FlowServices {
  pub fn new(ledger: Arc<dyn LedgerStore>, gateway: Arc<dyn PaymentGateway>, settings: ReconcileSettings) -> Self {
    Self {
      granter: EnrollmentGranter::new(ledger.clone()),
      ledger,
      gateway,
      settings: Arc::new(settings),
    }
  }
}

// --- Checkout ---

pub struct CheckoutCtxData {
  pub services: FlowServices,
  pub course: Course,
  pub buyer: SessionUser,
  /// Chosen up front because it is embedded in the external reference.
  pub sale_id: Uuid,
  pub external_reference: ExternalReference,

  pub intent: Option<GatewayIntent>,
  pub sale: Option<Sale>,
  pub redirect: Option<CheckoutRedirect>,
}

impl CheckoutCtxData {
  pub fn new(services: FlowServices, course: Course, buyer: SessionUser) -> Self {
    let sale_id = Uuid::new_v4();
    let external_reference = ExternalReference::for_attempt(buyer.id.clone(), course.id.clone(), sale_id);
    Self {
      services,
      course,
      buyer,
      sale_id,
      external_reference,
      intent: None,
      sale: None,
      redirect: None,
    }
  }
}

// --- Return from the gateway ---

pub struct ReturnCtxData {
  pub services: FlowServices,
  pub session: SessionContext,
  pub params: ReturnParams,

  pub verified: Option<VerifiedPayment>,
  /// Parsed reference, kept only when it belongs to the session user.
  pub reference: Option<ExternalReference>,
  pub outcome: Option<ReturnOutcome>,
}

impl ReturnCtxData {
  pub fn new(services: FlowServices, session: SessionContext, params: ReturnParams) -> Self {
    Self {
      services,
      session,
      params,
      verified: None,
      reference: None,
      outcome: None,
    }
  }
}

// --- Purchase sync ---

pub struct SyncCtxData {
  pub services: FlowServices,
  pub user: SessionUser,
  pub lookback: usize,

  pub transactions: Vec<GatewayTransaction>,
  pub report: SyncReport,
}

impl SyncCtxData {
  pub fn new(services: FlowServices, user: SessionUser) -> Self {
    let lookback = services.settings.sync_lookback;
    Self {
      services,
      user,
      lookback,
      transactions: Vec::new(),
      report: SyncReport::default(),
    }
  }
}
