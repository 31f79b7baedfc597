// src/pipelines/shipping_quote_pipeline.rs

use std::sync::Arc;
use tracing::info;

use crate::errors::{AppError, Result as AppResult};
use crate::pipelines::contexts::ShippingQuoteCtxData;
use stepline::{ContextData, Pipeline, PipelineControl, Stepline};

pub fn register_shipping_quote_pipeline(registry: &Arc<Stepline<AppError>>) {
  let mut p = Pipeline::<ShippingQuoteCtxData, AppError>::new(&[
    ("validate_destination", false, None),
    ("quote_shipping", false, None),
  ]);

  p.on_root("validate_destination", |ctx_data: ContextData<ShippingQuoteCtxData>| async move {
    let mut guard = ctx_data.write();
    let trimmed = guard.to_address.trim().to_string();
    if trimmed.is_empty() {
      return Err(AppError::Validation(vec!["Please provide a valid delivery address.".to_string()]));
    }
    guard.to_address = trimmed;
    Ok(PipelineControl::Continue)
  });

  p.on_root("quote_shipping", quote_shipping_step);

  registry.register_pipeline(p);
  info!("Shipping quote pipeline registered.");
}

async fn quote_shipping_step(ctx_data: ContextData<ShippingQuoteCtxData>) -> AppResult<PipelineControl> {
  let (to_address, is_return, shipping) = {
    let guard = ctx_data.read();
    (guard.to_address.clone(), guard.is_return, guard.app_state.shipping.clone())
  };
  let quote = shipping.quote_from_origin(&to_address, is_return).await?;
  ctx_data.write().quote = Some(quote);
  Ok(PipelineControl::Continue)
}
