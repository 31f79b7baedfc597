// src/services/payment_gateway.rs

//! Seam between the order workflow and an external payment gateway.

use async_trait::async_trait;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum GatewayError {
  #[error("Gateway authentication failed: {0}")]
  AuthFailed(String),

  #[error("Gateway refused to open the payment intent: {0}")]
  IntentCreationFailed(String),

  #[error("Gateway refused to capture the payment: {0}")]
  CaptureFailed(String),

  #[error("Gateway transport error: {0}")]
  Http(#[from] reqwest::Error),
}

/// What the payer is asked to approve.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentRequest {
  /// Amount in the settlement currency, two decimals.
  pub amount: Decimal,
  pub currency: String,
  pub description: String,
  pub order_id: Uuid,
  /// Callback bases; the order id is appended as `?orderId=`.
  pub success_url: String,
  pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedIntent {
  pub approval_url: String,
  pub provider_intent_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureStatus {
  Completed,
  /// The intent was captured by an earlier callback.
  AlreadyCaptured,
  /// Any other status reported by the gateway.
  Other(String),
}

impl CaptureStatus {
  pub fn is_settled(&self) -> bool {
    matches!(self, CaptureStatus::Completed | CaptureStatus::AlreadyCaptured)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOutcome {
  pub status: CaptureStatus,
  pub provider_transaction_id: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  /// A fresh access token. Tokens are never cached.
  async fn obtain_access_token(&self) -> Result<String, GatewayError>;

  async fn open_intent(&self, request: &IntentRequest) -> Result<OpenedIntent, GatewayError>;

  async fn capture_intent(&self, provider_intent_id: &str) -> Result<CaptureOutcome, GatewayError>;
}

/// Converts a local-currency total into the settlement currency at a fixed
/// rate, rounded half away from zero to two decimals.
pub fn settlement_amount(total: i64, exchange_rate: Decimal) -> Decimal {
  (Decimal::from(total) / exchange_rate).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Appends the order id the callbacks read back.
pub fn callback_url(base: &str, order_id: Uuid) -> String {
  format!("{}?orderId={}", base, order_id)
}
