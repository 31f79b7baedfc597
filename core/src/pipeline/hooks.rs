// src/pipeline/hooks.rs

//! Registration of `before`, `on`, `after` handlers and compensators.

use crate::core::context::{Compensator, Handler};
use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use crate::error::SteplineError;
use crate::pipeline::definition::Pipeline;
use std::future::Future;
use tracing::{event, Level};

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<SteplineError> + Send + Sync + 'static,
{
  fn box_handler<F, UserProvidedErr>(
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) -> Handler<TData, Err>
  where
    F: Future<Output = Result<PipelineControl, UserProvidedErr>> + Send + 'static,
    UserProvidedErr: Into<Err> + Send + Sync + 'static,
  {
    Box::new(move |ctx_data| {
      let user_fut = handler_fn(ctx_data);
      Box::pin(async move { user_fut.await.map_err(Into::into) })
    })
  }

  /// Registers a `before` hook for a given step.
  ///
  /// The handler's own error type only has to convert into the pipeline's `Err`.
  pub fn before_root<F, UserProvidedErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, UserProvidedErr>> + Send + 'static,
    UserProvidedErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    self
      .before
      .entry(step_name.to_string())
      .or_default()
      .push(Self::box_handler(handler_fn));
  }

  /// Registers an `on` hook for a given step.
  pub fn on_root<F, UserProvidedErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, UserProvidedErr>> + Send + 'static,
    UserProvidedErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    self
      .on
      .entry(step_name.to_string())
      .or_default()
      .push(Self::box_handler(handler_fn));
  }

  /// Registers an `after` hook for a given step.
  pub fn after_root<F, UserProvidedErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, UserProvidedErr>> + Send + 'static,
    UserProvidedErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    self
      .after
      .entry(step_name.to_string())
      .or_default()
      .push(Self::box_handler(handler_fn));
  }

  /// Registers the compensating action of a step, replacing any previous one.
  ///
  /// The compensator is armed once every handler of the step has returned
  /// `Continue`. If a later step fails, armed compensators run in reverse
  /// order before the error is returned to the caller. A compensator failure
  /// is logged and never replaces the original error.
  pub fn compensate_root<F, UserProvidedErr>(
    &mut self,
    step_name: &str,
    compensate_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<(), UserProvidedErr>> + Send + 'static,
    UserProvidedErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    let compensator: Compensator<TData, Err> = Box::new(move |ctx_data| {
      let user_fut = compensate_fn(ctx_data);
      Box::pin(async move { user_fut.await.map_err(Into::into) })
    });
    if self.compensators.insert(step_name.to_string(), compensator).is_some() {
      event!(Level::DEBUG, %step_name, "Replaced existing compensator.");
    }
  }
}
