// src/web/handlers/shipping_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::errors::AppError;
use crate::pipelines::contexts::ShippingQuoteCtxData;
use crate::state::AppState;
use stepline::{ContextData, PipelineResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingFeeRequest {
  #[serde(default)]
  pub to_address: Option<String>,
  #[serde(default)]
  pub is_return: bool,
}

#[instrument(name = "handler::calculate_shipping_fee", skip(app_state, body))]
pub async fn calculate_shipping_fee_handler(
  app_state: web::Data<AppState>,
  body: web::Json<ShippingFeeRequest>,
) -> Result<HttpResponse, AppError> {
  let request = body.into_inner();
  let ctx_data = ContextData::new(ShippingQuoteCtxData {
    app_state: app_state.get_ref().clone(),
    to_address: request.to_address.unwrap_or_default(),
    is_return: request.is_return,
    quote: None,
  });

  match app_state.stepline.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let quote = ctx_data
        .read()
        .quote
        .ok_or_else(|| AppError::Internal("Shipping quote missing after completion.".to_string()))?;
      Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": {
          "fee": quote.fee,
          "distanceKm": quote.distance_km,
          "distance": format!("{:.2} km", quote.distance_km),
        }
      })))
    }
    PipelineResult::Stopped => Err(AppError::Internal("Shipping quote was halted.".to_string())),
  }
}
