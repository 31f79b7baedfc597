// src/pipelines/gateway_cancel_pipeline.rs

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result as AppResult};
use crate::models::OrderTransition;
use crate::pipelines::contexts::GatewayCancelCtxData;
use stepline::{ContextData, Pipeline, PipelineControl, Stepline};

pub fn register_gateway_cancel_pipeline(registry: &Arc<Stepline<AppError>>) {
  let mut p = Pipeline::<GatewayCancelCtxData, AppError>::new(&[("cancel_pending_order", false, None)]);
  p.on_root("cancel_pending_order", cancel_pending_order_step);
  registry.register_pipeline(p);
  info!("Gateway cancel pipeline registered.");
}

/// Conditional `Pending -> Cancelled`; a no-op for any other state.
async fn cancel_pending_order_step(ctx_data: ContextData<GatewayCancelCtxData>) -> AppResult<PipelineControl> {
  let (order_id, orders) = {
    let guard = ctx_data.read();
    let order_id = guard.raw_order_id.as_deref().and_then(|raw| Uuid::parse_str(raw.trim()).ok());
    (order_id, guard.app_state.orders.clone())
  };
  let Some(order_id) = order_id else {
    warn!("Gateway cancel callback without a usable order id.");
    return Ok(PipelineControl::Stop);
  };

  let cancelled = orders.transition(order_id, &OrderTransition::cancel_pending()).await?;
  if cancelled {
    info!(%order_id, "Payer cancelled at the gateway; order cancelled.");
  } else {
    warn!(%order_id, "Cancel callback for an order that is missing or no longer pending.");
  }
  ctx_data.write().cancelled = cancelled;
  Ok(PipelineControl::Continue)
}
