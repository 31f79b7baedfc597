// src/services/paypal.rs

//! PayPal Orders v2 client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use super::payment_gateway::{
  callback_url, CaptureOutcome, CaptureStatus, GatewayError, IntentRequest, OpenedIntent, PaymentGateway,
};
use crate::config::PayPalConfig;

#[derive(Debug, Clone)]
pub struct PayPalGateway {
  config: PayPalConfig,
  http: Client,
}

impl PayPalGateway {
  pub fn new(config: PayPalConfig) -> Result<Self, reqwest::Error> {
    let http = Client::builder().timeout(config.timeout).build()?;
    Ok(Self { config, http })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
  }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
  access_token: String,
}

#[derive(Debug, Deserialize)]
struct Link {
  href: String,
  rel: String,
}

#[derive(Debug, Deserialize)]
struct CreatedOrder {
  id: String,
  #[serde(default)]
  links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct CapturedOrder {
  id: String,
  status: String,
  #[serde(default)]
  purchase_units: Vec<CapturedUnit>,
}

#[derive(Debug, Deserialize)]
struct CapturedUnit {
  payments: Option<CapturedPayments>,
}

#[derive(Debug, Deserialize)]
struct CapturedPayments {
  #[serde(default)]
  captures: Vec<Capture>,
}

#[derive(Debug, Deserialize)]
struct Capture {
  id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
  #[serde(default)]
  details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
  issue: String,
}

impl CapturedOrder {
  /// Capture id of the first purchase unit, else the order id.
  fn transaction_id(self) -> String {
    self
      .purchase_units
      .into_iter()
      .next()
      .and_then(|u| u.payments)
      .and_then(|p| p.captures.into_iter().next())
      .map(|c| c.id)
      .unwrap_or(self.id)
  }
}

fn is_already_captured(body: &str) -> bool {
  serde_json::from_str::<ErrorBody>(body)
    .map(|b| b.details.iter().any(|d| d.issue == "ORDER_ALREADY_CAPTURED"))
    .unwrap_or(false)
}

#[async_trait]
impl PaymentGateway for PayPalGateway {
  async fn obtain_access_token(&self) -> Result<String, GatewayError> {
    let response = self
      .http
      .post(self.url("/v1/oauth2/token"))
      .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
      .form(&[("grant_type", "client_credentials")])
      .send()
      .await?;

    if !response.status().is_success() {
      let status = response.status();
      let text = response.text().await.unwrap_or_default();
      return Err(GatewayError::AuthFailed(format!("status {}: {}", status, text)));
    }

    let parsed: TokenResponse = response.json().await?;
    Ok(parsed.access_token)
  }

  #[instrument(name = "paypal::open_intent", skip(self, request), fields(order_id = %request.order_id, amount = %request.amount), err(Display))]
  async fn open_intent(&self, request: &IntentRequest) -> Result<OpenedIntent, GatewayError> {
    let token = self.obtain_access_token().await?;

    let body = json!({
      "intent": "CAPTURE",
      "purchase_units": [{
        "description": request.description,
        "amount": {
          "currency_code": request.currency,
          "value": format!("{:.2}", request.amount),
        },
      }],
      "application_context": {
        "brand_name": self.config.brand_name,
        "landing_page": "LOGIN",
        "shipping_preference": "NO_SHIPPING",
        "user_action": "PAY_NOW",
        "return_url": callback_url(&request.success_url, request.order_id),
        "cancel_url": callback_url(&request.cancel_url, request.order_id),
      },
    });

    let response = self
      .http
      .post(self.url("/v2/checkout/orders"))
      .bearer_auth(&token)
      .json(&body)
      .send()
      .await?;

    if !response.status().is_success() {
      let status = response.status();
      let text = response.text().await.unwrap_or_default();
      return Err(GatewayError::IntentCreationFailed(format!("status {}: {}", status, text)));
    }

    let created: CreatedOrder = response.json().await?;
    let approval_url = created
      .links
      .into_iter()
      .find(|l| l.rel == "approve")
      .map(|l| l.href)
      .ok_or_else(|| GatewayError::IntentCreationFailed(format!("order {} has no approve link", created.id)))?;

    info!(provider_intent_id = %created.id, "PayPal order created.");
    Ok(OpenedIntent {
      approval_url,
      provider_intent_id: created.id,
    })
  }

  #[instrument(name = "paypal::capture_intent", skip(self), err(Display))]
  async fn capture_intent(&self, provider_intent_id: &str) -> Result<CaptureOutcome, GatewayError> {
    let token = self.obtain_access_token().await?;

    let response = self
      .http
      .post(self.url(&format!("/v2/checkout/orders/{}/capture", provider_intent_id)))
      .bearer_auth(&token)
      .json(&json!({}))
      .send()
      .await?;

    let status = response.status();
    if status == StatusCode::UNPROCESSABLE_ENTITY {
      let text = response.text().await.unwrap_or_default();
      if is_already_captured(&text) {
        warn!("PayPal order was already captured.");
        return Ok(CaptureOutcome {
          status: CaptureStatus::AlreadyCaptured,
          provider_transaction_id: provider_intent_id.to_string(),
        });
      }
      return Err(GatewayError::CaptureFailed(format!("status {}: {}", status, text)));
    }
    if !status.is_success() {
      let text = response.text().await.unwrap_or_default();
      return Err(GatewayError::CaptureFailed(format!("status {}: {}", status, text)));
    }

    let captured: CapturedOrder = response.json().await?;
    let capture_status = match captured.status.as_str() {
      "COMPLETED" => CaptureStatus::Completed,
      other => CaptureStatus::Other(other.to_string()),
    };
    Ok(CaptureOutcome {
      status: capture_status,
      provider_transaction_id: captured.transaction_id(),
    })
  }
}
