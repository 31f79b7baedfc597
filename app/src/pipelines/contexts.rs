// src/pipelines/contexts.rs

//! Underlying data structs of the application's pipelines.
//! Handlers receive these wrapped in `stepline::ContextData`.

use serde_json::Value;
use uuid::Uuid;

use crate::models::Order;
use crate::pipelines::validation::CheckoutInput;
use crate::services::{AppliedDecrements, CaptureOutcome, ResolvedLine, ShippingQuote};
use crate::state::AppState;

// --- Checkout ---

pub struct CheckoutCtxData {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub raw_request: Value,

  pub input: Option<CheckoutInput>,
  pub resolved_lines: Vec<ResolvedLine>,
  pub quote: Option<ShippingQuote>,
  pub order: Option<Order>,
  pub approval_url: Option<String>,
  pub cart_lines_removed: usize,
  pub stock: Option<AppliedDecrements>,
}

impl CheckoutCtxData {
  pub fn new(app_state: AppState, user_id: Uuid, raw_request: Value) -> Self {
    Self {
      app_state,
      user_id,
      raw_request,
      input: None,
      resolved_lines: Vec::new(),
      quote: None,
      order: None,
      approval_url: None,
      cart_lines_removed: 0,
      stock: None,
    }
  }
}

// --- Gateway callbacks ---

/// Where a success callback ended up. Each variant maps to one redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayReturnOutcome {
  InvalidCallback,
  OrderNotFound(Uuid),
  AlreadyProcessed(Uuid),
  CaptureRejected(Uuid),
  Captured(Uuid),
}

pub struct GatewayReturnCtxData {
  pub app_state: AppState,
  pub token: Option<String>,
  pub raw_order_id: Option<String>,

  pub order_id: Option<Uuid>,
  pub order: Option<Order>,
  pub capture: Option<CaptureOutcome>,
  pub outcome: Option<GatewayReturnOutcome>,
  pub stock: Option<AppliedDecrements>,
}

impl GatewayReturnCtxData {
  pub fn new(app_state: AppState, token: Option<String>, raw_order_id: Option<String>) -> Self {
    Self {
      app_state,
      token,
      raw_order_id,
      order_id: None,
      order: None,
      capture: None,
      outcome: None,
      stock: None,
    }
  }
}

pub struct GatewayCancelCtxData {
  pub app_state: AppState,
  pub raw_order_id: Option<String>,
  pub cancelled: bool,
}

// --- Shipping quote ---

pub struct ShippingQuoteCtxData {
  pub app_state: AppState,
  pub to_address: String,
  pub is_return: bool,
  pub quote: Option<ShippingQuote>,
}

// --- Owner cancellation ---

pub struct OrderCancelCtxData {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub order_id: Uuid,
  pub order: Option<Order>,
}
