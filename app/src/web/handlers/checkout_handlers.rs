// src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::pipelines::contexts::CheckoutCtxData;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;
use stepline::{ContextData, PipelineResult};

#[instrument(
    name = "handler::create_order",
    skip(app_state, auth_user, body),
    fields(user_id = %auth_user.user_id)
)]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
  let ctx_data = ContextData::new(CheckoutCtxData::new(
    app_state.get_ref().clone(),
    auth_user.user_id,
    body.into_inner(),
  ));

  match app_state.stepline.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let guard = ctx_data.read();
      let order = guard
        .order
        .as_ref()
        .ok_or_else(|| AppError::Internal("Checkout completed without an order.".to_string()))?;
      info!(
        order_id = %order.id,
        total_price = order.total_price,
        cart_lines_removed = guard.cart_lines_removed,
        stock_applied = guard.stock.as_ref().map(|s| s.applied),
        stock_skipped = guard.stock.as_ref().map(|s| s.skipped),
        "Checkout completed."
      );

      let response = match &guard.approval_url {
        Some(approval_url) => json!({
          "message": "Order created. Redirect the payer to the gateway to complete payment.",
          "order": order,
          "paymentApprovalUrl": approval_url,
        }),
        None => json!({
          "message": "Order placed successfully.",
          "order": order,
        }),
      };
      Ok(HttpResponse::Created().json(response))
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Checkout pipeline stopped unexpectedly.");
      Err(AppError::Internal("Checkout was halted before completion.".to_string()))
    }
    Err(app_err) => {
      warn!(error = %app_err, "Checkout failed.");
      Err(app_err)
    }
  }
}
