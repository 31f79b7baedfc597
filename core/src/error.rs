// src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SteplineError {
  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("Type mismatch during context downcast (expected {expected_type}, step: '{step_name}')")]
  TypeMismatch { step_name: String, expected_type: String },

  #[error("Configuration error for step '{step_name}': {message}")]
  ConfigurationError { step_name: String, message: String },

  #[error("Internal stepline error: {0}")]
  Internal(String),
}

pub type SteplineResult<T, E = SteplineError> = std::result::Result<T, E>;
