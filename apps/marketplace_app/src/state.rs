// apps/marketplace_app/src/state.rs
use crate::config::AppConfig;
use coursepay::Reconciliation;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub db_pool: PgPool,
  pub reconciliation: Arc<Reconciliation>,
  pub config: Arc<AppConfig>, // Share loaded config
}
