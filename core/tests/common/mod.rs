// tests/common/mod.rs
#![allow(dead_code)] // Not every test binary uses every helper.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use coursepay::{
  CheckoutError, ContextData, Course, CourseId, Enrollment, ExternalReference, GatewayIntent, GatewayKind, GatewayTransaction,
  IntentRequest, LedgerStore, MemoryLedger, NewSale, PaymentGateway, PaymentStatus, PipelineControl, PipelineError,
  ReconcileSettings, Reconciliation, Sale, SaleStatus, SessionContext, SessionUser, Url, UserId, VerifiedPayment,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::Level;
use uuid::Uuid;

// --- Tracing (once per test binary) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Pipeline engine fixtures ---

#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub counter: i32,
  pub message: String,
  pub steps_executed: Vec<String>,
  pub should_stop_at: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("Pipeline framework error: {0}")]
  Pipeline(String),

  #[error("Test handler failed: {0}")]
  Handler(String),
}

impl From<PipelineError> for TestError {
  fn from(pe: PipelineError) -> Self {
    TestError::Pipeline(format!("{:?}", pe))
  }
}

pub fn create_simple_handler(
  step_name: &'static str,
  message_to_append: &'static str,
) -> coursepay::pipeline::Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter += 1;
      guard.message.push_str(message_to_append);
      guard.steps_executed.push(step_name.to_string());
      if guard.should_stop_at.as_deref() == Some(step_name) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

pub fn create_failing_handler(
  step_name: &'static str,
  error_message: &'static str,
) -> coursepay::pipeline::Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().steps_executed.push(step_name.to_string());
      Err(TestError::Handler(error_message.to_string()))
    })
  })
}

// --- Domain fixtures ---

pub fn uid(raw: &str) -> UserId {
  UserId::new(raw).expect("valid user id")
}

pub fn cid(raw: &str) -> CourseId {
  CourseId::new(raw).expect("valid course id")
}

pub fn reference(user: &str, course_id: &str) -> ExternalReference {
  ExternalReference::new(uid(user), cid(course_id))
}

pub fn buyer(raw: &str) -> SessionUser {
  SessionUser {
    id: uid(raw),
    email: format!("{}@example.com", raw.to_lowercase()),
  }
}

pub fn session_for(raw: &str) -> SessionContext {
  SessionContext::signed_in(buyer(raw))
}

pub fn course(raw: &str, price_cents: i64) -> Course {
  Course::new(cid(raw), format!("Course {}", raw), price_cents, "USD")
}

pub fn return_endpoint() -> Url {
  Url::parse("https://courses.example/api/v1/checkout/return").expect("valid url")
}

pub fn settings() -> ReconcileSettings {
  ReconcileSettings::new(&return_endpoint())
}

pub fn reconciliation(ledger: Arc<dyn LedgerStore>, gateway: Arc<ScriptedGateway>) -> Reconciliation {
  Reconciliation::new(ledger, gateway, settings())
}

pub fn verified(payment_id: &str, status: PaymentStatus, reference: Option<&str>) -> VerifiedPayment {
  VerifiedPayment {
    payment_id: payment_id.to_string(),
    status,
    external_reference: reference.map(str::to_string),
  }
}

pub fn transaction(id: &str, status: PaymentStatus, reference: Option<&str>, minutes_ago: i64) -> GatewayTransaction {
  GatewayTransaction {
    id: id.to_string(),
    status,
    transaction_amount: Some(49.9),
    payer_email: Some("payer@example.com".to_string()),
    external_reference: reference.map(str::to_string),
    date_created: Some(Utc::now() - Duration::minutes(minutes_ago)),
  }
}

/// Inserts a `Started` sale the way checkout would have.
pub async fn seed_started_sale(ledger: &dyn LedgerStore, user: &str, course_id: &str) -> Sale {
  ledger
    .insert_sale(NewSale {
      id: uuid::Uuid::new_v4(),
      user_id: uid(user),
      course_id: cid(course_id),
      amount_cents: 4990,
      currency: "USD".to_string(),
      gateway_preference_id: format!("pref-seed-{}", course_id),
    })
    .await
    .expect("seed sale")
}

// --- Scripted gateway ---

/// In-process `PaymentGateway` whose answers are set by the test.
pub struct ScriptedGateway {
  kind: GatewayKind,
  payments: Mutex<HashMap<String, VerifiedPayment>>,
  transactions: Mutex<Vec<GatewayTransaction>>,
  pub unconfigured: AtomicBool,
  pub fail_requests: AtomicBool,
  pub create_calls: AtomicUsize,
  pub verify_calls: AtomicUsize,
  pub list_calls: AtomicUsize,
  pub last_list_limit: AtomicUsize,
  pub last_intent: Mutex<Option<IntentRequest>>,
}

impl ScriptedGateway {
  pub fn new() -> Arc<Self> {
    Arc::new(Self {
      kind: GatewayKind::Preference,
      payments: Mutex::new(HashMap::new()),
      transactions: Mutex::new(Vec::new()),
      unconfigured: AtomicBool::new(false),
      fail_requests: AtomicBool::new(false),
      create_calls: AtomicUsize::new(0),
      verify_calls: AtomicUsize::new(0),
      list_calls: AtomicUsize::new(0),
      last_list_limit: AtomicUsize::new(0),
      last_intent: Mutex::new(None),
    })
  }

  pub fn set_payment(&self, payment: VerifiedPayment) {
    self.payments.lock().insert(payment.payment_id.clone(), payment);
  }

  pub fn set_transactions(&self, transactions: Vec<GatewayTransaction>) {
    *self.transactions.lock() = transactions;
  }

  fn request_error(&self) -> CheckoutError {
    CheckoutError::GatewayRequest {
      gateway: self.kind,
      message: "scripted outage".to_string(),
      http_status: Some(503),
    }
  }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
  fn kind(&self) -> GatewayKind {
    self.kind
  }

  async fn create_intent(&self, request: &IntentRequest) -> Result<GatewayIntent, CheckoutError> {
    let n = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
    if self.unconfigured.load(Ordering::SeqCst) {
      return Err(CheckoutError::GatewayConfig {
        gateway: self.kind,
        message: "access token is not configured".to_string(),
      });
    }
    if self.fail_requests.load(Ordering::SeqCst) {
      return Err(self.request_error());
    }
    *self.last_intent.lock() = Some(request.clone());
    let intent_id = format!("pref-{}", n);
    let checkout_url = Url::parse(&format!("https://gateway.test/checkout?pref_id={}", intent_id)).expect("valid url");
    Ok(GatewayIntent { intent_id, checkout_url })
  }

  async fn verify_status(&self, payment_id: &str) -> Result<VerifiedPayment, CheckoutError> {
    self.verify_calls.fetch_add(1, Ordering::SeqCst);
    if self.fail_requests.load(Ordering::SeqCst) {
      return Err(self.request_error());
    }
    Ok(
      self
        .payments
        .lock()
        .get(payment_id)
        .cloned()
        .unwrap_or_else(|| verified(payment_id, PaymentStatus::NotFound, None)),
    )
  }

  async fn list_recent_transactions(&self, limit: usize) -> Result<Vec<GatewayTransaction>, CheckoutError> {
    self.list_calls.fetch_add(1, Ordering::SeqCst);
    self.last_list_limit.store(limit, Ordering::SeqCst);
    if self.fail_requests.load(Ordering::SeqCst) {
      return Err(self.request_error());
    }
    Ok(self.transactions.lock().iter().take(limit).cloned().collect())
  }
}

// --- Ledger with injectable failures ---

/// Wraps `MemoryLedger` and fails selected operations on demand.
#[derive(Default)]
pub struct FlakyLedger {
  pub inner: MemoryLedger,
  pub fail_sale_inserts: AtomicBool,
  pub fail_sale_updates: AtomicBool,
  pub fail_enrollment_reads: AtomicBool,
  pub fail_enrollment_inserts: AtomicBool,
}

impl FlakyLedger {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }
}

fn injected(flag: &AtomicBool) -> bool {
  flag.load(Ordering::SeqCst)
}

#[async_trait]
impl LedgerStore for FlakyLedger {
  async fn insert_sale(&self, sale: NewSale) -> Result<Sale, CheckoutError> {
    if injected(&self.fail_sale_inserts) {
      return Err(CheckoutError::ledger_write("insert_sale", anyhow::anyhow!("injected failure")));
    }
    self.inner.insert_sale(sale).await
  }

  async fn advance_sale(
    &self,
    user_id: &UserId,
    course_id: &CourseId,
    sale_id: Option<Uuid>,
    to: SaleStatus,
    payment_id: Option<&str>,
  ) -> Result<Option<Sale>, CheckoutError> {
    if injected(&self.fail_sale_updates) {
      return Err(CheckoutError::ledger_write("advance_sale", anyhow::anyhow!("injected failure")));
    }
    self.inner.advance_sale(user_id, course_id, sale_id, to, payment_id).await
  }

  async fn find_enrollment(&self, user_id: &UserId, course_id: &CourseId) -> Result<Option<Enrollment>, CheckoutError> {
    if injected(&self.fail_enrollment_reads) {
      return Err(CheckoutError::ledger_read("find_enrollment", anyhow::anyhow!("injected failure")));
    }
    self.inner.find_enrollment(user_id, course_id).await
  }

  async fn insert_enrollment_if_absent(&self, user_id: &UserId, course_id: &CourseId) -> Result<bool, CheckoutError> {
    if injected(&self.fail_enrollment_inserts) {
      return Err(CheckoutError::ledger_write(
        "insert_enrollment_if_absent",
        anyhow::anyhow!("injected failure"),
      ));
    }
    self.inner.insert_enrollment_if_absent(user_id, course_id).await
  }

  async fn list_enrollments(&self, user_id: &UserId) -> Result<Vec<Enrollment>, CheckoutError> {
    self.inner.list_enrollments(user_id).await
  }

  async fn list_sales(&self, user_id: &UserId) -> Result<Vec<Sale>, CheckoutError> {
    self.inner.list_sales(user_id).await
  }
}
