// src/pipelines/mod.rs

//! Defines and registers every pipeline of the storefront's order workflow.

use crate::errors::AppError;
use std::sync::Arc;
use stepline::Stepline;

pub mod contexts;
pub mod validation;

pub mod checkout_pipeline;
pub mod gateway_cancel_pipeline;
pub mod gateway_return_pipeline;
pub mod order_cancel_pipeline;
pub mod shipping_quote_pipeline;

/// Registers all pipelines with the registry. Called once at startup.
pub fn register_all_pipelines(registry: &Arc<Stepline<AppError>>) {
  tracing::info!("Registering pipelines...");

  checkout_pipeline::register_checkout_pipeline(registry);
  gateway_return_pipeline::register_gateway_return_pipeline(registry);
  gateway_cancel_pipeline::register_gateway_cancel_pipeline(registry);
  shipping_quote_pipeline::register_shipping_quote_pipeline(registry);
  order_cancel_pipeline::register_order_cancel_pipeline(registry);

  tracing::info!("All application pipelines registered.");
}
