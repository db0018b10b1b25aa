// apps/marketplace_app/src/main.rs

// Declare modules for the application
mod config;
mod db;
mod errors;
mod models;
mod state;
mod web;

use crate::config::{AppConfig, LogFormat};
use crate::db::PgLedgerStore;
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer}; // Renamed web to actix_data
use anyhow::Context;
use coursepay::Reconciliation;
use sqlx::PgPool;
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan; // For span events in tracing
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
  // RUST_LOG overrides the default level
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE); // Log when spans close, showing duration
  match format {
    LogFormat::Json => builder.json().init(),
    LogFormat::Pretty => builder.init(),
  }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  // Load application configuration
  let app_config = Arc::new(AppConfig::from_env().context("Failed to load application configuration")?);
  init_tracing(app_config.log_format);

  tracing::info!(gateway = %app_config.gateway.kind, "Starting course marketplace server...");
  if !app_config.has_gateway_credentials() {
    // The server still starts; checkouts answer with a configuration error.
    tracing::warn!(gateway = %app_config.gateway.kind, "No payment gateway credentials configured.");
  }

  // Initialize Database Pool
  let db_pool = PgPool::connect(&app_config.database_url)
    .await
    .context("Failed to connect to the database")?;
  tracing::info!("Successfully connected to the database.");

  let ledger = Arc::new(PgLedgerStore::new(db_pool.clone()));
  let gateway = app_config.gateway.build().context("Failed to build the payment gateway client")?;
  let reconciliation = Arc::new(Reconciliation::new(ledger, gateway, app_config.reconcile_settings()?));

  let app_state = AppState {
    db_pool,
    reconciliation,
    config: app_config.clone(),
  };

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone())) // Share AppState with handlers
      .wrap(tracing_actix_web::TracingLogger::default()) // Actix middleware for tracing requests
      .configure(web::routes::configure_app_routes)
  })
  .bind(&server_address)
  .with_context(|| format!("Failed to bind {}", server_address))?
  .run()
  .await?;

  Ok(())
}
