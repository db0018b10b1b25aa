// coursepay/src/pipelines/checkout_pipeline.rs

use crate::error::{CheckoutError, PipelineError};
use crate::gateway::IntentRequest;
use crate::model::NewSale;
use crate::pipeline::{ContextData, Pipeline, PipelineControl};
use crate::pipelines::contexts::CheckoutCtxData;
use reqwest::Url;
use tracing::{info, warn};
use uuid::Uuid;

/// Where to send the buyer to pay, plus the ledger row tracking the attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRedirect {
  pub sale_id: Uuid,
  pub intent_id: String,
  pub redirect_url: Url,
}

pub fn build_checkout_pipeline() -> Pipeline<CheckoutCtxData, CheckoutError> {
  let mut pipeline = Pipeline::new(&[
    ("create_gateway_intent", false),
    ("record_started_sale", false),
    ("build_checkout_redirect", false),
  ]);

  pipeline.on_root("create_gateway_intent", create_gateway_intent);
  pipeline.on_root("record_started_sale", record_started_sale);
  pipeline.on_root("build_checkout_redirect", build_checkout_redirect);

  pipeline
}

async fn create_gateway_intent(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl, CheckoutError> {
  let (gateway, request) = {
    let guard = ctx_data.read();
    let request = IntentRequest {
      course: guard.course.clone(),
      payer_email: guard.buyer.email.clone(),
      external_reference: guard.external_reference.clone(),
      return_urls: guard.services.settings.return_urls.clone(),
    };
    (guard.services.gateway.clone(), request)
  };

  if request.course.price_cents <= 0 {
    return Err(CheckoutError::Validation(format!(
      "Course '{}' has no price and cannot be checked out.",
      request.course.id
    )));
  }

  let intent = gateway.create_intent(&request).await?;
  info!(intent_id = %intent.intent_id, gateway = %gateway.kind(), "Gateway intent created.");

  ctx_data.write().intent = Some(intent);
  Ok(PipelineControl::Continue)
}

async fn record_started_sale(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl, CheckoutError> {
  let (ledger, new_sale) = {
    let guard = ctx_data.read();
    let intent = guard.intent.as_ref().ok_or(PipelineError::MissingContextValue {
      step_name: "record_started_sale",
      field: "intent",
    })?;
    let new_sale = NewSale {
      id: guard.sale_id,
      user_id: guard.buyer.id.clone(),
      course_id: guard.course.id.clone(),
      amount_cents: guard.course.price_cents,
      currency: guard.course.currency.clone(),
      gateway_preference_id: intent.intent_id.clone(),
    };
    (guard.services.ledger.clone(), new_sale)
  };

  let intent_id = new_sale.gateway_preference_id.clone();
  match ledger.insert_sale(new_sale).await {
    Ok(sale) => {
      info!(sale_id = %sale.id, "Sale recorded as started.");
      ctx_data.write().sale = Some(sale);
      Ok(PipelineControl::Continue)
    }
    Err(e) => {
      // The intent exists on the gateway side with no sale row. A payment
      // against it is still found later through its external reference.
      warn!(intent_id = %intent_id, error = %e, "Could not record sale for a created gateway intent.");
      Err(e)
    }
  }
}

async fn build_checkout_redirect(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl, CheckoutError> {
  let mut guard = ctx_data.write();
  let intent = guard.intent.clone().ok_or(PipelineError::MissingContextValue {
    step_name: "build_checkout_redirect",
    field: "intent",
  })?;
  let sale_id = guard.sale.as_ref().map(|s| s.id).ok_or(PipelineError::MissingContextValue {
    step_name: "build_checkout_redirect",
    field: "sale",
  })?;

  guard.redirect = Some(CheckoutRedirect {
    sale_id,
    intent_id: intent.intent_id,
    redirect_url: intent.checkout_url,
  });
  Ok(PipelineControl::Continue)
}
