// src/pipelines/gateway_return_pipeline.rs

//! Success callback of the payment gateway. Safe to invoke any number of
//! times for the same order: only the first winning transition has effects.

use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result as AppResult};
use crate::models::{OrderStatus, OrderTransition, PaymentMethod, PaymentStatus};
use crate::pipelines::contexts::{GatewayReturnCtxData, GatewayReturnOutcome};
use stepline::{ContextData, Pipeline, PipelineControl, Stepline};

pub fn register_gateway_return_pipeline(registry: &Arc<Stepline<AppError>>) {
  let mut p = Pipeline::<GatewayReturnCtxData, AppError>::new(&[
    ("parse_callback_params", false, None),
    ("load_order", false, None),
    ("capture_payment", false, None),
    ("finalize_capture", false, None),
  ]);

  p.on_root("parse_callback_params", parse_callback_params_step);
  p.on_root("load_order", load_order_step);
  p.compensate_root("load_order", fail_pending_order);
  p.on_root("capture_payment", capture_payment_step);
  p.on_root("finalize_capture", finalize_capture_step);

  registry.register_pipeline(p);
  info!("Gateway return pipeline registered.");
}

fn stop_with(ctx_data: &ContextData<GatewayReturnCtxData>, outcome: GatewayReturnOutcome) -> AppResult<PipelineControl> {
  ctx_data.write().outcome = Some(outcome);
  Ok(PipelineControl::Stop)
}

async fn parse_callback_params_step(ctx_data: ContextData<GatewayReturnCtxData>) -> AppResult<PipelineControl> {
  let parsed = {
    let guard = ctx_data.read();
    let token_present = guard.token.as_deref().is_some_and(|t| !t.trim().is_empty());
    let order_id = guard.raw_order_id.as_deref().and_then(|raw| Uuid::parse_str(raw.trim()).ok());
    order_id.filter(|_| token_present)
  };

  match parsed {
    Some(order_id) => {
      ctx_data.write().order_id = Some(order_id);
      Ok(PipelineControl::Continue)
    }
    None => {
      warn!("Gateway success callback without a usable token or order id.");
      stop_with(&ctx_data, GatewayReturnOutcome::InvalidCallback)
    }
  }
}

#[instrument(name = "gateway_return::load_order", skip(ctx_data), err(Display))]
async fn load_order_step(ctx_data: ContextData<GatewayReturnCtxData>) -> AppResult<PipelineControl> {
  let (order_id, token, orders) = {
    let guard = ctx_data.read();
    let order_id = guard
      .order_id
      .ok_or_else(|| AppError::Internal("order id missing after callback parsing".to_string()))?;
    let token = guard.token.as_deref().map(str::trim).unwrap_or_default().to_string();
    (order_id, token, guard.app_state.orders.clone())
  };

  let Some(order) = orders.find(order_id).await? else {
    warn!(%order_id, "Gateway callback for an unknown order.");
    return stop_with(&ctx_data, GatewayReturnOutcome::OrderNotFound(order_id));
  };

  if !order.is_awaiting_payment() {
    info!(
      %order_id,
      status = ?order.status,
      payment_status = ?order.payment.status,
      "Order already processed; ignoring repeated callback."
    );
    return stop_with(&ctx_data, GatewayReturnOutcome::AlreadyProcessed(order_id));
  }

  // The token must be the intent opened for this very order at checkout.
  let intent_matches = order.payment.method == PaymentMethod::ExternalGateway
    && order.payment.transaction_id.as_deref() == Some(token.as_str());
  if !intent_matches {
    warn!(
      %order_id,
      method = ?order.payment.method,
      "Callback token does not belong to this order; ignoring."
    );
    return stop_with(&ctx_data, GatewayReturnOutcome::InvalidCallback);
  }

  ctx_data.write().order = Some(order);
  Ok(PipelineControl::Continue)
}

/// Any failure after the order was loaded leaves it `Cancelled`/`Failed`,
/// unless another callback already moved it.
async fn fail_pending_order(ctx_data: ContextData<GatewayReturnCtxData>) -> AppResult<()> {
  let (order_id, orders) = {
    let guard = ctx_data.read();
    (guard.order_id, guard.app_state.orders.clone())
  };
  let Some(order_id) = order_id else {
    return Ok(());
  };

  if orders.transition(order_id, &OrderTransition::payment_failed()).await? {
    warn!(%order_id, "Marked order as failed after callback processing error.");
  }
  Ok(())
}

#[instrument(name = "gateway_return::capture_payment", skip(ctx_data), err(Display))]
async fn capture_payment_step(ctx_data: ContextData<GatewayReturnCtxData>) -> AppResult<PipelineControl> {
  let (order, app_state) = {
    let guard = ctx_data.read();
    (guard.order.clone(), guard.app_state.clone())
  };
  let Some((order_id, intent_id)) = order.and_then(|o| o.payment.transaction_id.map(|t| (o.id, t))) else {
    return Err(AppError::Internal("loaded order has no gateway intent before capture".to_string()));
  };

  let capture = app_state
    .gateway
    .capture_intent(&intent_id)
    .await
    .map_err(AppError::Capture)?;

  if !capture.status.is_settled() {
    warn!(%order_id, status = ?capture.status, "Gateway did not complete the capture.");
    let failed = app_state
      .orders
      .transition(order_id, &OrderTransition::payment_failed())
      .await?;
    ctx_data.write().capture = Some(capture);
    if !failed {
      warn!(%order_id, "Order was moved by a concurrent callback before it could be marked failed.");
      return stop_with(&ctx_data, GatewayReturnOutcome::AlreadyProcessed(order_id));
    }
    return stop_with(&ctx_data, GatewayReturnOutcome::CaptureRejected(order_id));
  }

  ctx_data.write().capture = Some(capture);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "gateway_return::finalize_capture", skip(ctx_data), err(Display))]
async fn finalize_capture_step(ctx_data: ContextData<GatewayReturnCtxData>) -> AppResult<PipelineControl> {
  let (order, capture, app_state) = {
    let guard = ctx_data.read();
    (guard.order.clone(), guard.capture.clone(), guard.app_state.clone())
  };
  let (Some(order), Some(capture)) = (order, capture) else {
    return Err(AppError::Internal("order or capture missing before finalization".to_string()));
  };

  let won = app_state
    .orders
    .transition(
      order.id,
      &OrderTransition::capture_completed(capture.provider_transaction_id.clone()),
    )
    .await?;

  if won {
    let stock = app_state.inventory.apply_for_order_items(&order.items).await;
    info!(order_id = %order.id, transaction_id = %capture.provider_transaction_id, "Gateway payment captured.");
    let mut guard = ctx_data.write();
    guard.stock = Some(stock);
    guard.outcome = Some(GatewayReturnOutcome::Captured(order.id));
    return Ok(PipelineControl::Continue);
  }

  // A concurrent callback moved the order first.
  let current = app_state.orders.find(order.id).await?;
  let outcome = match current {
    Some(o) if o.status == OrderStatus::Processing && o.payment.status == PaymentStatus::Completed => {
      GatewayReturnOutcome::Captured(order.id)
    }
    Some(_) => GatewayReturnOutcome::AlreadyProcessed(order.id),
    None => {
      error!(order_id = %order.id, "Order vanished while finalizing its capture.");
      GatewayReturnOutcome::OrderNotFound(order.id)
    }
  };
  ctx_data.write().outcome = Some(outcome);
  Ok(PipelineControl::Continue)
}
