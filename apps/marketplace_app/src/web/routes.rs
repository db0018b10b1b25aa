// apps/marketplace_app/src/web/routes.rs

use actix_web::web;

use crate::state::AppState;
use crate::web::handlers::{checkout_handlers, course_handlers, purchase_handlers};

// Reports the database and which gateway is active; never the credentials.
async fn health_check_handler(app_state: web::Data<AppState>) -> actix_web::HttpResponse {
  let database = match sqlx::query("SELECT 1").execute(&app_state.db_pool).await {
    Ok(_) => "ok",
    Err(e) => {
      tracing::warn!(error = %e, "Health check could not reach the database.");
      "unavailable"
    }
  };
  actix_web::HttpResponse::Ok().json(serde_json::json!({
    "status": "ok",
    "database": database,
    "gateway": app_state.reconciliation.gateway_kind(),
    "gatewayConfigured": app_state.config.has_gateway_credentials(),
  }))
}

// This function will be called in `main.rs` to configure services for the Actix App.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1") // Base path for API version 1
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/courses")
          .route("", web::get().to(course_handlers::list_courses_handler))
          .route("/{course_id}", web::get().to(course_handlers::get_course_handler))
          .route("/{course_id}/access", web::get().to(purchase_handlers::course_access_handler)),
      )
      // Checkout Routes; /return is where the gateway sends the buyer back
      .service(
        web::scope("/checkout")
          .route("/return", web::get().to(checkout_handlers::checkout_return_handler))
          .route("/{course_id}", web::post().to(checkout_handlers::start_checkout_handler)),
      )
      .service(
        web::scope("/purchases")
          .route("/sync", web::post().to(purchase_handlers::sync_purchases_handler))
          .route("/sales", web::get().to(purchase_handlers::list_sales_handler)),
      )
      .route("/enrollments", web::get().to(purchase_handlers::list_enrollments_handler)),
  );
}
