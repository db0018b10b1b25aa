// tests/sync_scanner_tests.rs
mod common;

use common::*;
use coursepay::{CheckoutError, GatewayTransaction, LedgerStore, MemoryLedger, PaymentStatus, DEFAULT_SYNC_LOOKBACK};
use serial_test::serial;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// 30 recent transactions: entries 5 and 17 are approved purchases of U1,
/// everything else belongs to other buyers or was not approved.
fn merchant_history() -> Vec<GatewayTransaction> {
  (0..30)
    .map(|i| {
      let id = format!("T{:02}", i);
      match i {
        5 => transaction(&id, PaymentStatus::Approved, Some("U1---C5"), i),
        17 => transaction(&id, PaymentStatus::Approved, Some("U1---C17---a1b2"), i),
        i if i % 3 == 0 => transaction(&id, PaymentStatus::Approved, Some(&format!("U{}---C{}", i + 100, i)), i),
        i if i % 3 == 1 => transaction(&id, PaymentStatus::Rejected, Some(&format!("U1---C{}", i)), i),
        _ => transaction(&id, PaymentStatus::Pending, Some(&format!("U1---C{}", i)), i),
      }
    })
    .collect()
}

#[tokio::test]
#[serial]
async fn test_sync_enrolls_only_qualifying_entries() {
  setup_tracing();
  let ledger = Arc::new(MemoryLedger::new());
  let gateway = ScriptedGateway::new();
  gateway.set_transactions(merchant_history());
  let core = reconciliation(ledger.clone(), gateway.clone());

  let report = core.sync_purchases(&buyer("U1")).await.unwrap();

  assert_eq!(report.scanned, 30);
  assert_eq!(report.enrolled, 2);
  assert_eq!(report.enrolled_courses, vec![cid("C5"), cid("C17")]);
  assert_eq!(gateway.last_list_limit.load(Ordering::SeqCst), DEFAULT_SYNC_LOOKBACK);

  let enrolled: Vec<_> = ledger
    .list_enrollments(&uid("U1"))
    .await
    .unwrap()
    .into_iter()
    .map(|e| e.course_id)
    .collect();
  assert_eq!(enrolled.len(), 2);
  assert!(enrolled.contains(&cid("C5")));
  assert!(enrolled.contains(&cid("C17")));
}

#[tokio::test]
#[serial]
async fn test_second_sync_enrolls_nothing() {
  setup_tracing();
  let ledger = Arc::new(MemoryLedger::new());
  let gateway = ScriptedGateway::new();
  gateway.set_transactions(merchant_history());
  let core = reconciliation(ledger.clone(), gateway.clone());

  let first = core.sync_purchases(&buyer("U1")).await.unwrap();
  let second = core.sync_purchases(&buyer("U1")).await.unwrap();

  assert_eq!(first.enrolled, 2);
  assert_eq!(second.enrolled, 0);
  assert_eq!(second.already_enrolled, 2);
  assert_eq!(ledger.enrollment_count(), 2);
}

#[tokio::test]
#[serial]
async fn test_sync_skips_already_enrolled_courses() {
  setup_tracing();
  let ledger = Arc::new(MemoryLedger::new());
  ledger.insert_enrollment_if_absent(&uid("U1"), &cid("C5")).await.unwrap();
  let gateway = ScriptedGateway::new();
  gateway.set_transactions(merchant_history());
  let core = reconciliation(ledger.clone(), gateway.clone());

  let report = core.sync_purchases(&buyer("U1")).await.unwrap();

  assert_eq!(report.enrolled, 1);
  assert_eq!(report.already_enrolled, 1);
  assert_eq!(report.enrolled_courses, vec![cid("C17")]);
}

#[tokio::test]
#[serial]
async fn test_sync_tallies_foreign_and_malformed_entries() {
  setup_tracing();
  let ledger = Arc::new(MemoryLedger::new());
  let gateway = ScriptedGateway::new();
  gateway.set_transactions(vec![
    transaction("T1", PaymentStatus::Approved, Some("U1---C1"), 1),
    transaction("T2", PaymentStatus::Approved, Some("U2---C1"), 2),
    transaction("T3", PaymentStatus::Approved, None, 3),
    transaction("T4", PaymentStatus::Approved, Some("not-a-reference"), 4),
    transaction("T5", PaymentStatus::Pending, Some("U1---C2"), 5),
  ]);
  let core = reconciliation(ledger.clone(), gateway.clone());

  let report = core.sync_purchases(&buyer("U1")).await.unwrap();

  assert_eq!(report.scanned, 5);
  assert_eq!(report.enrolled, 1);
  assert_eq!(report.foreign, 2);
  assert_eq!(report.malformed, 1);
  assert_eq!(report.not_approved, 1);
  assert_eq!(report.failed, 0);
  assert!(ledger.list_enrollments(&uid("U2")).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn test_sync_continues_past_ledger_failures() {
  setup_tracing();
  let ledger = FlakyLedger::new();
  ledger.fail_enrollment_reads.store(true, Ordering::SeqCst);
  let gateway = ScriptedGateway::new();
  gateway.set_transactions(merchant_history());
  let core = reconciliation(ledger.clone(), gateway.clone());

  let report = core.sync_purchases(&buyer("U1")).await.unwrap();

  assert_eq!(report.enrolled, 0);
  assert_eq!(report.failed, 2);

  ledger.fail_enrollment_reads.store(false, Ordering::SeqCst);
  let retry = core.sync_purchases(&buyer("U1")).await.unwrap();
  assert_eq!(retry.enrolled, 2);
}

#[tokio::test]
#[serial]
async fn test_sync_surfaces_listing_failure() {
  setup_tracing();
  let ledger = Arc::new(MemoryLedger::new());
  let gateway = ScriptedGateway::new();
  gateway.fail_requests.store(true, Ordering::SeqCst);
  let core = reconciliation(ledger.clone(), gateway.clone());

  let err = core.sync_purchases(&buyer("U1")).await.unwrap_err();

  assert!(matches!(err, CheckoutError::GatewayRequest { .. }));
  assert_eq!(ledger.enrollment_count(), 0);
}

#[tokio::test]
#[serial]
async fn test_sync_with_empty_history_reports_zero() {
  setup_tracing();
  let ledger = Arc::new(MemoryLedger::new());
  let gateway = ScriptedGateway::new();
  let core = reconciliation(ledger.clone(), gateway.clone());

  let report = core.sync_purchases(&buyer("U1")).await.unwrap();

  assert_eq!(report, coursepay::SyncReport::default());
}
