// src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::services::catalog::{LineItemError, LookupError};
use crate::services::payment_gateway::GatewayError;
use crate::services::shipping::ShippingError;
use crate::store::StoreError;
use stepline::SteplineError;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {}", .0.join("; "))]
  Validation(Vec<String>),

  #[error("{} line item(s) could not be fulfilled", .0.len())]
  LineItems(Vec<LineItemError>),

  #[error("Shipping Error: {0}")]
  Shipping(#[from] ShippingError),

  #[error("Payment initiation failed: {0}")]
  PaymentInitiation(#[source] GatewayError),

  #[error("Payment capture failed: {0}")]
  Capture(#[source] GatewayError),

  #[error("Persistence Error: {0}")]
  Persistence(#[from] StoreError),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: SteplineError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl AppError {
  /// Machine-checkable error kind returned to clients.
  pub fn kind(&self) -> &'static str {
    match self {
      AppError::Validation(_) => "ValidationError",
      AppError::LineItems(errors) => {
        if errors.iter().any(|e| matches!(e.error, LookupError::InsufficientStock { .. })) {
          "InsufficientStock"
        } else if errors.iter().all(|e| matches!(e.error, LookupError::NotFound { .. })) {
          "NotFound"
        } else {
          "VariationNotFound"
        }
      }
      AppError::Shipping(e) => e.kind(),
      AppError::PaymentInitiation(_) => "PaymentInitiationError",
      AppError::Capture(_) => "CaptureFailed",
      AppError::Persistence(_) => "PersistenceError",
      AppError::Auth(_) => "AuthenticationError",
      AppError::NotFound(_) => "NotFound",
      AppError::Conflict(_) => "Conflict",
      AppError::Config(_) => "ConfigurationError",
      AppError::Workflow { .. } => "WorkflowError",
      AppError::Internal(_) => "InternalError",
    }
  }

  /// Infrastructure failures keep their details in the logs only.
  fn is_infrastructure(&self) -> bool {
    match self {
      AppError::Shipping(e) => !e.is_client_error(),
      AppError::PaymentInitiation(_)
      | AppError::Capture(_)
      | AppError::Persistence(_)
      | AppError::Config(_)
      | AppError::Workflow { .. }
      | AppError::Internal(_) => true,
      _ => false,
    }
  }

  fn public_message(&self) -> String {
    match self {
      AppError::Validation(_) => "The request data is invalid.".to_string(),
      AppError::LineItems(_) => "One or more products are invalid or out of stock.".to_string(),
      AppError::Shipping(e) if e.is_client_error() => e.to_string(),
      AppError::Shipping(_) => "The shipping service is unavailable.".to_string(),
      AppError::PaymentInitiation(_) => "Could not initiate the payment with the gateway.".to_string(),
      AppError::Capture(_) => "Could not capture the payment with the gateway.".to_string(),
      AppError::Auth(m) | AppError::NotFound(m) | AppError::Conflict(m) => m.clone(),
      _ => "An internal error occurred.".to_string(),
    }
  }

  fn details(&self) -> Vec<String> {
    match self {
      AppError::Validation(violations) => violations.clone(),
      AppError::LineItems(errors) => errors.iter().map(ToString::to_string).collect(),
      _ => Vec::new(),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::LineItems(_) if self.kind() == "InsufficientStock" => StatusCode::CONFLICT,
      AppError::LineItems(_) => StatusCode::NOT_FOUND,
      AppError::Shipping(e) => e.status_code(),
      AppError::PaymentInitiation(_) | AppError::Capture(_) => StatusCode::BAD_GATEWAY,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Conflict(_) => StatusCode::CONFLICT,
      AppError::Persistence(_) | AppError::Config(_) | AppError::Workflow { .. } | AppError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn error_response(&self) -> HttpResponse {
    if self.is_infrastructure() {
      tracing::error!(application_error = %self, kind = self.kind(), "Responding with infrastructure error");
    } else {
      tracing::warn!(application_error = %self, kind = self.kind(), "Responding with client error");
    }
    HttpResponse::build(self.status_code()).json(json!({
      "error": self.kind(),
      "message": self.public_message(),
      "details": self.details(),
    }))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
