// src/pipelines/checkout_pipeline.rs

use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::errors::{AppError, Result as AppResult};
use crate::models::{Order, OrderItem, PaymentMethod, ShippingAddress};
use crate::pipelines::contexts::CheckoutCtxData;
use crate::pipelines::validation::validate_checkout_request;
use crate::services::payment_gateway::settlement_amount;
use crate::services::{IntentRequest, StockLine};
use stepline::{ContextData, Pipeline, PipelineControl, Stepline};

pub const SUCCESS_CALLBACK_PATH: &str = "/payment/gateway/success";
pub const CANCEL_CALLBACK_PATH: &str = "/payment/gateway/cancel";

pub fn register_checkout_pipeline(registry: &Arc<Stepline<AppError>>) {
  let mut p = Pipeline::<CheckoutCtxData, AppError>::new(&[
    ("validate_checkout_request", false, None),
    ("resolve_line_items", false, None),
    ("quote_shipping", false, None),
    ("persist_pending_order", false, None),
    ("prune_cart", true, None),
    ("settle_payment", false, None),
  ]);

  p.on_root("validate_checkout_request", validate_checkout_request_step);
  p.on_root("resolve_line_items", resolve_line_items_step);
  p.on_root("quote_shipping", quote_shipping_step);
  p.on_root("persist_pending_order", persist_pending_order_step);
  p.compensate_root("persist_pending_order", delete_pending_order);
  p.on_root("prune_cart", prune_cart_step);
  p.on_root("settle_payment", settle_payment_step);

  registry.register_pipeline(p);
  info!("Checkout pipeline registered.");
}

#[instrument(name = "checkout::validate", skip(ctx_data), err(Display))]
async fn validate_checkout_request_step(ctx_data: ContextData<CheckoutCtxData>) -> AppResult<PipelineControl> {
  let mut guard = ctx_data.write();
  let input = validate_checkout_request(&guard.raw_request).map_err(AppError::Validation)?;
  info!(
    lines = input.items.len(),
    payment_method = ?input.payment_method,
    "Checkout request validated."
  );
  guard.input = Some(input);
  Ok(PipelineControl::Continue)
}

fn validated_input(ctx_data: &ContextData<CheckoutCtxData>) -> AppResult<crate::pipelines::validation::CheckoutInput> {
  ctx_data
    .read()
    .input
    .clone()
    .ok_or_else(|| AppError::Internal("checkout input missing after validation".to_string()))
}

#[instrument(name = "checkout::resolve_line_items", skip(ctx_data), err(Display))]
async fn resolve_line_items_step(ctx_data: ContextData<CheckoutCtxData>) -> AppResult<PipelineControl> {
  let input = validated_input(&ctx_data)?;
  let catalog = ctx_data.read().app_state.catalog.clone();

  let resolved = catalog.resolve_all(&input.items).await?;
  ctx_data.write().resolved_lines = resolved;
  Ok(PipelineControl::Continue)
}

#[instrument(name = "checkout::quote_shipping", skip(ctx_data), err(Display))]
async fn quote_shipping_step(ctx_data: ContextData<CheckoutCtxData>) -> AppResult<PipelineControl> {
  let input = validated_input(&ctx_data)?;
  let shipping = ctx_data.read().app_state.shipping.clone();

  let quote = shipping.quote_from_origin(&input.to_address, input.is_return).await?;
  ctx_data.write().quote = Some(quote);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "checkout::persist_pending_order", skip(ctx_data), err(Display))]
async fn persist_pending_order_step(ctx_data: ContextData<CheckoutCtxData>) -> AppResult<PipelineControl> {
  let (order, orders) = {
    let guard = ctx_data.read();
    let input = guard
      .input
      .as_ref()
      .ok_or_else(|| AppError::Internal("checkout input missing after validation".to_string()))?;
    let quote = guard
      .quote
      .ok_or_else(|| AppError::Internal("shipping quote missing before persistence".to_string()))?;

    let items = guard
      .resolved_lines
      .iter()
      .map(|line| OrderItem {
        product_id: line.product.id,
        product_variation_id: line.variation.id,
        name: line.product.name.clone(),
        price: line.product.price,
        quantity: line.quantity,
        size: line.variation.size.clone(),
        color: line.variation.color.clone(),
        images: line.product.images.clone(),
      })
      .collect();

    let order = Order::new_pending(
      guard.user_id,
      items,
      ShippingAddress {
        full_name: input.customer_name.clone(),
        phone: input.customer_phone.clone(),
        address: input.to_address.clone(),
        distance: quote.distance_km,
        shipping_fee: quote.fee,
      },
      input.payment_method,
      input.note.clone(),
    );
    (order, guard.app_state.orders.clone())
  };

  orders.insert(&order).await?;
  info!(order_id = %order.id, total_price = order.total_price, "Pending order persisted.");
  ctx_data.write().order = Some(order);
  Ok(PipelineControl::Continue)
}

/// Undoes `persist_pending_order` when a later step fails.
async fn delete_pending_order(ctx_data: ContextData<CheckoutCtxData>) -> AppResult<()> {
  let (order_id, orders) = {
    let guard = ctx_data.read();
    (guard.order.as_ref().map(|o| o.id), guard.app_state.orders.clone())
  };
  let Some(order_id) = order_id else {
    return Ok(());
  };

  if orders.delete(order_id).await? {
    warn!(%order_id, "Deleted pending order after a later checkout step failed.");
  }
  ctx_data.write().order = None;
  Ok(())
}

#[instrument(name = "checkout::prune_cart", skip(ctx_data), err(Display))]
async fn prune_cart_step(ctx_data: ContextData<CheckoutCtxData>) -> AppResult<PipelineControl> {
  let (user_id, keys, carts) = {
    let guard = ctx_data.read();
    let keys: Vec<_> = guard
      .order
      .as_ref()
      .map(|o| o.items.iter().map(OrderItem::cart_key).collect())
      .unwrap_or_default();
    (guard.user_id, keys, guard.app_state.carts.clone())
  };

  let removed = carts.remove_items(user_id, &keys).await?;
  info!(removed, "Ordered lines removed from cart.");
  ctx_data.write().cart_lines_removed = removed;
  Ok(PipelineControl::Continue)
}

#[instrument(name = "checkout::settle_payment", skip(ctx_data), err(Display))]
async fn settle_payment_step(ctx_data: ContextData<CheckoutCtxData>) -> AppResult<PipelineControl> {
  let (order, app_state) = {
    let guard = ctx_data.read();
    let order = guard
      .order
      .clone()
      .ok_or_else(|| AppError::Internal("order missing before payment settlement".to_string()))?;
    (order, guard.app_state.clone())
  };

  match order.payment.method {
    PaymentMethod::Cash => {
      let lines: Vec<StockLine> = order
        .items
        .iter()
        .map(|item| StockLine {
          product_id: item.product_id,
          variation_id: Some(item.product_variation_id),
          quantity: item.quantity,
        })
        .collect();
      let stock = app_state.inventory.apply_decrements(&lines).await;
      info!(order_id = %order.id, "Cash order placed.");
      ctx_data.write().stock = Some(stock);
    }
    PaymentMethod::ExternalGateway => {
      let config = &app_state.config;
      let request = IntentRequest {
        amount: settlement_amount(order.total_price, config.settlement.exchange_rate),
        currency: config.settlement.currency.clone(),
        description: format!("Payment for order {}", order.id),
        order_id: order.id,
        success_url: format!("{}{}", config.app_base_url, SUCCESS_CALLBACK_PATH),
        cancel_url: format!("{}{}", config.app_base_url, CANCEL_CALLBACK_PATH),
      };

      let intent = app_state.gateway.open_intent(&request).await.map_err(|e| {
        error!(order_id = %order.id, error = %e, "Opening the payment intent failed.");
        AppError::PaymentInitiation(e)
      })?;

      app_state
        .orders
        .set_transaction_id(order.id, &intent.provider_intent_id)
        .await?;
      info!(order_id = %order.id, provider_intent_id = %intent.provider_intent_id, "Awaiting gateway approval.");

      let mut guard = ctx_data.write();
      if let Some(order) = guard.order.as_mut() {
        order.payment.transaction_id = Some(intent.provider_intent_id);
      }
      guard.approval_url = Some(intent.approval_url);
    }
  }
  Ok(PipelineControl::Continue)
}
