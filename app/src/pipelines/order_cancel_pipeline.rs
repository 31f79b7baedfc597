// src/pipelines/order_cancel_pipeline.rs

//! Owner-initiated cancellation of an order that has not been settled.

use std::sync::Arc;
use tracing::info;

use crate::errors::{AppError, Result as AppResult};
use crate::models::OrderTransition;
use crate::pipelines::contexts::OrderCancelCtxData;
use stepline::{ContextData, Pipeline, PipelineControl, Stepline};

pub fn register_order_cancel_pipeline(registry: &Arc<Stepline<AppError>>) {
  let mut p = Pipeline::<OrderCancelCtxData, AppError>::new(&[
    ("load_owned_order", false, None),
    ("cancel_order", false, None),
  ]);

  p.on_root("load_owned_order", load_owned_order_step);
  p.on_root("cancel_order", cancel_order_step);

  registry.register_pipeline(p);
  info!("Order cancel pipeline registered.");
}

async fn load_owned_order_step(ctx_data: ContextData<OrderCancelCtxData>) -> AppResult<PipelineControl> {
  let (order_id, user_id, orders) = {
    let guard = ctx_data.read();
    (guard.order_id, guard.user_id, guard.app_state.orders.clone())
  };
  let order = orders
    .find_for_user(order_id, user_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found.", order_id)))?;
  ctx_data.write().order = Some(order);
  Ok(PipelineControl::Continue)
}

async fn cancel_order_step(ctx_data: ContextData<OrderCancelCtxData>) -> AppResult<PipelineControl> {
  let (order_id, orders) = {
    let guard = ctx_data.read();
    (guard.order_id, guard.app_state.orders.clone())
  };

  if !orders.transition(order_id, &OrderTransition::cancel_pending()).await? {
    return Err(AppError::Conflict(format!(
      "Order {} can no longer be cancelled.",
      order_id
    )));
  }
  info!(%order_id, "Order cancelled by its owner.");

  let refreshed = orders.find(order_id).await?;
  ctx_data.write().order = refreshed;
  Ok(PipelineControl::Continue)
}
