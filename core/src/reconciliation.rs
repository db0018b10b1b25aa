// coursepay/src/reconciliation.rs

use crate::error::{CheckoutError, PipelineError};
use crate::gateway::{GatewayKind, PaymentGateway, ReturnUrls};
use crate::granter::GrantOutcome;
use crate::ledger::LedgerStore;
use crate::model::{Course, CourseId, Enrollment, Sale, SessionContext, SessionUser, UserId};
use crate::pipeline::{ContextData, Pipeline};
use crate::pipelines::{
  build_checkout_pipeline, build_return_pipeline, build_sync_pipeline, CheckoutCtxData, CheckoutRedirect, FlowServices,
  ReturnCtxData, ReturnOutcome, ReturnParams, SyncCtxData, SyncReport,
};
use crate::reference::ExternalReference;
use reqwest::Url;
use std::sync::Arc;
use tracing::instrument;

/// How many recent gateway transactions a sync inspects.
pub const DEFAULT_SYNC_LOOKBACK: usize = 30;

#[derive(Debug, Clone)]
pub struct ReconcileSettings {
  pub return_urls: ReturnUrls,
  pub sync_lookback: usize,
}

impl ReconcileSettings {
  pub fn new(return_endpoint: &Url) -> Self {
    Self {
      return_urls: ReturnUrls::from_return_endpoint(return_endpoint),
      sync_lookback: DEFAULT_SYNC_LOOKBACK,
    }
  }

  pub fn with_sync_lookback(mut self, lookback: usize) -> Self {
    self.sync_lookback = lookback.max(1);
    self
  }
}

/// Entry point for the web layer: starts checkouts, settles returns, runs
/// purchase syncs and answers access checks.
pub struct Reconciliation {
  services: FlowServices,
  checkout: Pipeline<CheckoutCtxData, CheckoutError>,
  returns: Pipeline<ReturnCtxData, CheckoutError>,
  sync: Pipeline<SyncCtxData, CheckoutError>,
}

impl Reconciliation {
  pub fn new(ledger: Arc<dyn LedgerStore>, gateway: Arc<dyn PaymentGateway>, settings: ReconcileSettings) -> Self {
    Self {
      services: FlowServices::new(ledger, gateway, settings),
      checkout: build_checkout_pipeline(),
      returns: build_return_pipeline(),
      sync: build_sync_pipeline(),
    }
  }

  pub fn gateway_kind(&self) -> GatewayKind {
    self.services.gateway.kind()
  }

  #[instrument(name = "Reconciliation::initiate_checkout", skip_all, fields(user_id = %buyer.id, course_id = %course.id), err(Display))]
  pub async fn initiate_checkout(&self, course: &Course, buyer: &SessionUser) -> Result<CheckoutRedirect, CheckoutError> {
    let ctx_data = ContextData::new(CheckoutCtxData::new(self.services.clone(), course.clone(), buyer.clone()));
    self.checkout.run(ctx_data.clone()).await?;

    let redirect = ctx_data.read().redirect.clone();
    redirect.ok_or_else(|| PipelineError::Internal("checkout finished without a redirect".to_string()).into())
  }

  #[instrument(name = "Reconciliation::reconcile_return", skip_all, fields(payment_id = ?params.payment_id), err(Display))]
  pub async fn reconcile_return(&self, session: &SessionContext, params: ReturnParams) -> Result<ReturnOutcome, CheckoutError> {
    let ctx_data = ContextData::new(ReturnCtxData::new(self.services.clone(), session.clone(), params));
    self.returns.run(ctx_data.clone()).await?;

    let outcome = ctx_data.read().outcome.clone();
    outcome.ok_or_else(|| PipelineError::Internal("return reconciliation finished without an outcome".to_string()).into())
  }

  #[instrument(name = "Reconciliation::sync_purchases", skip_all, fields(user_id = %user.id), err(Display))]
  pub async fn sync_purchases(&self, user: &SessionUser) -> Result<SyncReport, CheckoutError> {
    let ctx_data = ContextData::new(SyncCtxData::new(self.services.clone(), user.clone()));
    self.sync.run(ctx_data.clone()).await?;

    let report = ctx_data.read().report.clone();
    Ok(report)
  }

  pub async fn grant(&self, reference: &ExternalReference, payment_id: &str) -> Result<GrantOutcome, CheckoutError> {
    self.services.granter.grant(reference, payment_id).await
  }

  pub async fn has_access(&self, user_id: &UserId, course_id: &CourseId) -> Result<bool, CheckoutError> {
    self.services.granter.has_access(user_id, course_id).await
  }

  pub async fn enrollments(&self, user_id: &UserId) -> Result<Vec<Enrollment>, CheckoutError> {
    self.services.ledger.list_enrollments(user_id).await
  }

  pub async fn sales(&self, user_id: &UserId) -> Result<Vec<Sale>, CheckoutError> {
    self.services.ledger.list_sales(user_id).await
  }
}
