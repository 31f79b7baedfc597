// src/web/routes.rs

use actix_web::{web, HttpResponse};

use crate::errors::AppError;
use crate::web::handlers::{checkout_handlers, gateway_handlers, order_handlers, shipping_handlers};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Malformed bodies and path ids surface through `AppError` like every other failure.
fn extractor_configs(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(web::JsonConfig::default().error_handler(|err, _req| {
      AppError::Validation(vec![format!("Malformed JSON body: {}", err)]).into()
    }))
    .app_data(
      web::PathConfig::default()
        .error_handler(|err, _req| AppError::NotFound(format!("Resource not found: {}", err)).into()),
    );
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  extractor_configs(cfg);

  cfg
    .route("/health", web::get().to(health_check_handler))
    .service(
      web::scope("/payment")
        .route(
          "/calculate-shipping-fee",
          web::post().to(shipping_handlers::calculate_shipping_fee_handler),
        )
        .route("/createOrder", web::post().to(checkout_handlers::create_order_handler))
        .route("/gateway/success", web::get().to(gateway_handlers::gateway_success_handler))
        .route("/gateway/cancel", web::get().to(gateway_handlers::gateway_cancel_handler)),
    )
    .service(
      web::scope("/order/user")
        .route("", web::get().to(order_handlers::list_user_orders_handler))
        .route("/{order_id}", web::get().to(order_handlers::get_user_order_handler))
        .route("/{order_id}", web::delete().to(order_handlers::cancel_user_order_handler)),
    );
}
