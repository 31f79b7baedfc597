// src/pipeline/execution.rs

//! `Pipeline::run()`: executes steps in order, arms compensators as steps
//! finish, and unwinds them when a later step fails.

use crate::core::context::Handler;
use crate::core::context_data::ContextData;
use crate::core::control::{PipelineControl, PipelineResult};
use crate::core::step::StepDef;
use crate::error::SteplineError;
use crate::pipeline::definition::Pipeline;
use tracing::{event, instrument, span, Instrument, Level};

enum StepOutcome {
  Finished,
  Skipped,
  Stopped,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<SteplineError> + Send + Sync + 'static,
{
  /// Executes the pipeline against the shared context `ctx_data`.
  ///
  /// - A handler returning `Stop` ends the run with `PipelineResult::Stopped`.
  /// - A failing optional step is logged and the run continues.
  /// - A failing non-optional step runs the compensators of every step that
  ///   already finished, newest first, then returns the original error.
  #[instrument(
        name = "Pipeline::run",
        skip_all,
        fields(
            pipeline_context_data_type = %std::any::type_name::<TData>(),
            num_steps = self.steps.len(),
        ),
        err(Display)
    )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");
    let mut armed: Vec<&str> = Vec::new();

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_span = span!(
        Level::INFO,
        "pipeline_step",
        step_name = step_def.name.as_str(),
        step_index = step_idx,
        optional = step_def.optional
      );

      match self.run_step(step_def, ctx_data.clone()).instrument(step_span).await {
        Ok(StepOutcome::Finished) => {
          if self.compensators.contains_key(&step_def.name) {
            armed.push(step_def.name.as_str());
          }
        }
        Ok(StepOutcome::Skipped) => {}
        Ok(StepOutcome::Stopped) => {
          event!(Level::INFO, step_name = %step_def.name, "Pipeline stopped by a handler.");
          return Ok(PipelineResult::Stopped);
        }
        Err(e) if step_def.optional => {
          event!(Level::WARN, step_name = %step_def.name, error = %e, "Optional step failed, continuing.");
        }
        Err(e) => {
          event!(Level::ERROR, step_name = %step_def.name, error = %e, "Step failed.");
          self.unwind(&armed, ctx_data.clone()).await;
          return Err(e);
        }
      }
    }

    event!(Level::DEBUG, "Pipeline execution completed successfully.");
    Ok(PipelineResult::Completed)
  }

  async fn run_step(&self, step_def: &StepDef<TData>, ctx_data: ContextData<TData>) -> Result<StepOutcome, Err> {
    let step_name = step_def.name.as_str();

    if let Some(skip_cond_fn) = &step_def.skip_if {
      if skip_cond_fn(ctx_data.clone()) {
        event!(Level::INFO, "Step skipped due to 'skip_if' condition.");
        return Ok(StepOutcome::Skipped);
      }
    }

    let phases = [
      ("before", self.before.get(step_name)),
      ("on", self.on.get(step_name)),
      ("after", self.after.get(step_name)),
    ];

    if phases.iter().all(|(_, handlers)| handlers.map_or(true, |v| v.is_empty())) {
      if step_def.optional {
        event!(Level::DEBUG, "Optional step has no handlers, skipping.");
        return Ok(StepOutcome::Skipped);
      }
      event!(Level::ERROR, "Non-optional step has no handlers.");
      return Err(Err::from(SteplineError::HandlerMissing {
        step_name: step_def.name.clone(),
      }));
    }

    for (phase, handlers) in phases {
      if let Some(handlers) = handlers {
        if run_phase(phase, handlers, &ctx_data).await? == PipelineControl::Stop {
          return Ok(StepOutcome::Stopped);
        }
      }
    }

    event!(Level::DEBUG, "Step processing finished successfully.");
    Ok(StepOutcome::Finished)
  }

  async fn unwind(&self, armed: &[&str], ctx_data: ContextData<TData>) {
    for step_name in armed.iter().rev() {
      let Some(compensate) = self.compensators.get(*step_name) else {
        continue;
      };
      let span = span!(Level::INFO, "compensation", step_name = *step_name);
      match compensate(ctx_data.clone()).instrument(span).await {
        Ok(()) => event!(Level::INFO, step_name = *step_name, "Compensation applied."),
        Err(e) => event!(
          Level::ERROR,
          step_name = *step_name,
          error = %e,
          "Compensation failed, continuing with remaining compensators."
        ),
      }
    }
  }
}

async fn run_phase<TData, Err>(
  phase: &'static str,
  handlers: &[Handler<TData, Err>],
  ctx_data: &ContextData<TData>,
) -> Result<PipelineControl, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + Send + Sync + 'static,
{
  for (handler_idx, handler_fn) in handlers.iter().enumerate() {
    let handler_span = span!(Level::DEBUG, "handler", phase, handler_index = handler_idx);
    match handler_fn(ctx_data.clone()).instrument(handler_span).await {
      Ok(PipelineControl::Continue) => {}
      Ok(PipelineControl::Stop) => {
        event!(Level::INFO, phase, "Step halted by handler.");
        return Ok(PipelineControl::Stop);
      }
      Err(e) => {
        event!(Level::ERROR, phase, error = %e, "Handler failed.");
        return Err(e);
      }
    }
  }
  Ok(PipelineControl::Continue)
}
