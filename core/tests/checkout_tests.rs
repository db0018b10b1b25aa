// tests/checkout_tests.rs
mod common;

use common::*;
use coursepay::{CheckoutError, ExternalReference, LedgerStore, MemoryLedger, PaymentStatus, ReturnParams, SaleStatus};
use serial_test::serial;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[tokio::test]
#[serial]
async fn test_checkout_records_started_sale_and_returns_redirect() {
  setup_tracing();
  let ledger = Arc::new(MemoryLedger::new());
  let gateway = ScriptedGateway::new();
  let core = reconciliation(ledger.clone(), gateway.clone());

  let redirect = core.initiate_checkout(&course("C1", 4990), &buyer("U1")).await.unwrap();

  assert_eq!(redirect.intent_id, "pref-1");
  assert!(redirect.redirect_url.as_str().contains("pref_id=pref-1"));

  let sales = ledger.list_sales(&uid("U1")).await.unwrap();
  assert_eq!(sales.len(), 1);
  assert_eq!(sales[0].id, redirect.sale_id);
  assert_eq!(sales[0].status, SaleStatus::Started);
  assert_eq!(sales[0].amount_cents, 4990);
  assert_eq!(sales[0].gateway_preference_id, "pref-1");
}

#[tokio::test]
#[serial]
async fn test_checkout_sends_reference_and_return_urls_to_gateway() {
  setup_tracing();
  let ledger = Arc::new(MemoryLedger::new());
  let gateway = ScriptedGateway::new();
  let core = reconciliation(ledger.clone(), gateway.clone());

  let redirect = core.initiate_checkout(&course("C1", 4990), &buyer("U1")).await.unwrap();

  let request = gateway.last_intent.lock().clone().expect("intent request captured");
  let reference = ExternalReference::parse(&request.external_reference.to_string()).unwrap();
  assert_eq!(reference.user_id(), &uid("U1"));
  assert_eq!(reference.course_id(), &cid("C1"));
  assert_eq!(reference.disambiguator(), Some(redirect.sale_id.simple().to_string().as_str()));
  assert_eq!(request.payer_email, "u1@example.com");
  assert!(request.return_urls.success.as_str().ends_with("/checkout/return?outcome=success"));
  assert!(request.return_urls.pending.as_str().ends_with("outcome=pending"));
}

#[tokio::test]
#[serial]
async fn test_each_checkout_is_a_separate_attempt() {
  setup_tracing();
  let ledger = Arc::new(MemoryLedger::new());
  let gateway = ScriptedGateway::new();
  let core = reconciliation(ledger.clone(), gateway.clone());

  let first = core.initiate_checkout(&course("C1", 4990), &buyer("U1")).await.unwrap();
  let second = core.initiate_checkout(&course("C1", 4990), &buyer("U1")).await.unwrap();

  assert_ne!(first.sale_id, second.sale_id);
  assert_eq!(ledger.sale_count(), 2);
}

#[tokio::test]
#[serial]
async fn test_unconfigured_gateway_writes_nothing() {
  setup_tracing();
  let ledger = Arc::new(MemoryLedger::new());
  let gateway = ScriptedGateway::new();
  gateway.unconfigured.store(true, Ordering::SeqCst);
  let core = reconciliation(ledger.clone(), gateway.clone());

  let err = core.initiate_checkout(&course("C1", 4990), &buyer("U1")).await.unwrap_err();

  assert!(matches!(err, CheckoutError::GatewayConfig { .. }));
  assert!(!err.is_retryable());
  assert_eq!(ledger.sale_count(), 0);
}

#[tokio::test]
#[serial]
async fn test_gateway_outage_writes_nothing() {
  setup_tracing();
  let ledger = Arc::new(MemoryLedger::new());
  let gateway = ScriptedGateway::new();
  gateway.fail_requests.store(true, Ordering::SeqCst);
  let core = reconciliation(ledger.clone(), gateway.clone());

  let err = core.initiate_checkout(&course("C1", 4990), &buyer("U1")).await.unwrap_err();

  assert!(matches!(err, CheckoutError::GatewayRequest { http_status: Some(503), .. }));
  assert!(err.is_retryable());
  assert_eq!(ledger.sale_count(), 0);
}

#[tokio::test]
#[serial]
async fn test_unpriced_course_is_rejected_before_gateway_call() {
  setup_tracing();
  let ledger = Arc::new(MemoryLedger::new());
  let gateway = ScriptedGateway::new();
  let core = reconciliation(ledger.clone(), gateway.clone());

  let err = core.initiate_checkout(&course("FREE", 0), &buyer("U1")).await.unwrap_err();

  assert!(matches!(err, CheckoutError::Validation(_)));
  assert_eq!(gateway.create_calls.load(Ordering::SeqCst), 0);
  assert_eq!(ledger.sale_count(), 0);
}

#[tokio::test]
#[serial]
async fn test_sale_write_failure_surfaces_after_intent_created() {
  setup_tracing();
  let ledger = FlakyLedger::new();
  ledger.fail_sale_inserts.store(true, Ordering::SeqCst);
  let gateway = ScriptedGateway::new();
  let core = reconciliation(ledger.clone(), gateway.clone());

  let err = core.initiate_checkout(&course("C1", 4990), &buyer("U1")).await.unwrap_err();

  assert!(matches!(err, CheckoutError::LedgerWrite { operation: "insert_sale", .. }));
  assert_eq!(gateway.create_calls.load(Ordering::SeqCst), 1);
  assert_eq!(ledger.inner.sale_count(), 0);
}

#[tokio::test]
#[serial]
async fn test_paying_an_earlier_attempt_marks_that_attempt_paid() {
  setup_tracing();
  let ledger = Arc::new(MemoryLedger::new());
  let gateway = ScriptedGateway::new();
  let core = reconciliation(ledger.clone(), gateway.clone());

  let first = core.initiate_checkout(&course("C1", 4990), &buyer("U1")).await.unwrap();
  let first_reference = ExternalReference::for_attempt(uid("U1"), cid("C1"), first.sale_id).to_string();
  let second = core.initiate_checkout(&course("C1", 4990), &buyer("U1")).await.unwrap();

  // The buyer completes the first gateway page, not the second.
  gateway.set_payment(verified("P1", PaymentStatus::Approved, Some(&first_reference)));
  let params = ReturnParams::from_pairs([("payment_id", "P1"), ("status", "approved")]);
  let outcome = core.reconcile_return(&session_for("U1"), params).await.unwrap();
  assert!(outcome.clears_query());

  let sales = ledger.list_sales(&uid("U1")).await.unwrap();
  let status_of = |id| sales.iter().find(|s| s.id == id).map(|s| s.status);
  assert_eq!(status_of(first.sale_id), Some(SaleStatus::Paid));
  assert_eq!(status_of(second.sale_id), Some(SaleStatus::Started));
  assert_eq!(ledger.enrollment_count(), 1);
}
