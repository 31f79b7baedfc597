// src/web/handlers/gateway_handlers.rs

//! Browser redirects from the payment gateway. These handlers never return
//! an error body: every outcome becomes a redirect to the storefront.

use actix_web::http::header::LOCATION;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::pipelines::contexts::{GatewayCancelCtxData, GatewayReturnCtxData, GatewayReturnOutcome};
use crate::state::AppState;
use stepline::ContextData;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayReturnQuery {
  pub token: Option<String>,
  pub order_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayCancelQuery {
  pub order_id: Option<String>,
}

fn redirect(frontend_base_url: &str, path: &str) -> HttpResponse {
  let location = format!("{}{}", frontend_base_url.trim_end_matches('/'), path);
  HttpResponse::Found().insert_header((LOCATION, location)).finish()
}

fn order_ref(raw: Option<&str>) -> String {
  raw
    .and_then(|r| Uuid::parse_str(r.trim()).ok())
    .map(|id| id.to_string())
    .unwrap_or_else(|| "unknown".to_string())
}

pub fn return_redirect_path(outcome: &GatewayReturnOutcome, raw_order_id: Option<&str>) -> String {
  match outcome {
    GatewayReturnOutcome::InvalidCallback => format!(
      "/payment/error?message=InvalidCallbackData&orderId={}",
      order_ref(raw_order_id)
    ),
    GatewayReturnOutcome::OrderNotFound(id) => format!("/payment/error?message=OrderNotFound&orderId={}", id),
    GatewayReturnOutcome::AlreadyProcessed(id) => format!("/order-details/{}?status=already_processed", id),
    GatewayReturnOutcome::CaptureRejected(id) => {
      format!("/payment/error?message=PaymentCaptureFailed&orderId={}", id)
    }
    GatewayReturnOutcome::Captured(id) => format!("/checkout/success?orderId={}", id),
  }
}

#[instrument(name = "handler::gateway_success", skip(app_state, query), fields(order_id = ?query.order_id))]
pub async fn gateway_success_handler(
  app_state: web::Data<AppState>,
  query: web::Query<GatewayReturnQuery>,
) -> HttpResponse {
  let query = query.into_inner();
  let raw_order_id = query.order_id.clone();
  let frontend = app_state.config.frontend_base_url.clone();

  let ctx_data = ContextData::new(GatewayReturnCtxData::new(
    app_state.get_ref().clone(),
    query.token,
    query.order_id,
  ));

  let path = match app_state.stepline.run(ctx_data.clone()).await {
    Ok(_) => {
      let (outcome, stock_applied) = {
        let guard = ctx_data.read();
        (guard.outcome.clone(), guard.stock.as_ref().map(|s| s.applied))
      };
      match outcome {
        Some(outcome) => {
          info!(?outcome, ?stock_applied, "Gateway success callback handled.");
          return_redirect_path(&outcome, raw_order_id.as_deref())
        }
        None => {
          error!("Gateway success callback finished without an outcome.");
          processing_error_path(raw_order_id.as_deref())
        }
      }
    }
    Err(app_err) => {
      error!(error = %app_err, "Gateway success callback failed.");
      processing_error_path(raw_order_id.as_deref())
    }
  };
  redirect(&frontend, &path)
}

fn processing_error_path(raw_order_id: Option<&str>) -> String {
  format!("/payment/error?message=ProcessingError&orderId={}", order_ref(raw_order_id))
}

#[instrument(name = "handler::gateway_cancel", skip(app_state, query), fields(order_id = ?query.order_id))]
pub async fn gateway_cancel_handler(
  app_state: web::Data<AppState>,
  query: web::Query<GatewayCancelQuery>,
) -> HttpResponse {
  let raw_order_id = query.into_inner().order_id;
  let frontend = app_state.config.frontend_base_url.clone();

  let ctx_data = ContextData::new(GatewayCancelCtxData {
    app_state: app_state.get_ref().clone(),
    raw_order_id: raw_order_id.clone(),
    cancelled: false,
  });
  match app_state.stepline.run(ctx_data.clone()).await {
    Ok(_) => info!(cancelled = ctx_data.read().cancelled, "Gateway cancel callback handled."),
    Err(app_err) => error!(error = %app_err, "Gateway cancel callback failed."),
  }

  let path = match raw_order_id.as_deref().and_then(|r| Uuid::parse_str(r.trim()).ok()) {
    Some(id) => format!("/payment/cancel?orderId={}", id),
    None => "/payment/cancel".to_string(),
  };
  redirect(&frontend, &path)
}
