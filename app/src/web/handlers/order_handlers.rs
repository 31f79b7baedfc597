// src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::pipelines::contexts::OrderCancelCtxData;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;
use stepline::{ContextData, PipelineResult};

#[instrument(name = "handler::list_user_orders", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn list_user_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.orders.list_by_user(auth_user.user_id).await?;
  info!(count = orders.len(), "Fetched user orders.");
  Ok(HttpResponse::Ok().json(json!({
    "orders": orders,
    "totalOrders": orders.len(),
  })))
}

#[instrument(name = "handler::get_user_order", skip(app_state, auth_user, path), fields(user_id = %auth_user.user_id, order_id = %path.as_ref()))]
pub async fn get_user_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let order = app_state
    .orders
    .find_for_user(order_id, auth_user.user_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found.", order_id)))?;
  Ok(HttpResponse::Ok().json(order))
}

#[instrument(name = "handler::cancel_user_order", skip(app_state, auth_user, path), fields(user_id = %auth_user.user_id, order_id = %path.as_ref()))]
pub async fn cancel_user_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let ctx_data = ContextData::new(OrderCancelCtxData {
    app_state: app_state.get_ref().clone(),
    user_id: auth_user.user_id,
    order_id: path.into_inner(),
    order: None,
  });

  match app_state.stepline.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let order = ctx_data.read().order.clone();
      Ok(HttpResponse::Ok().json(json!({
        "message": "Order cancelled.",
        "order": order,
      })))
    }
    PipelineResult::Stopped => Err(AppError::Internal("Order cancellation was halted.".to_string())),
  }
}
