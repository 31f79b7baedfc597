// src/registry.rs

//! `Stepline<E>`: a registry of pipelines keyed by their context data type.
//! Pipelines are `Pipeline<TData, PipelineHandlerError>`; the registry
//! returns results with an application-level error type `E`.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineResult;
use crate::error::SteplineError;
use crate::pipeline::definition::Pipeline as CorePipeline;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, instrument, Level};

/// Type-erased pipeline runner stored by the registry.
#[async_trait]
trait AnyPipelineRunner<ApplicationError>: Send + Sync
where
  ApplicationError: std::error::Error + Send + Sync + 'static,
{
  /// `ctx_obj` must contain a `ContextData<TData>` for the wrapped pipeline's `TData`.
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<PipelineResult, ApplicationError>;
}

struct PipelineWrapper<TData, PipelineHandlerError, ApplicationError>
where
  TData: 'static + Send + Sync,
  PipelineHandlerError: std::error::Error + From<SteplineError> + Send + Sync + 'static,
  ApplicationError: std::error::Error + From<PipelineHandlerError> + From<SteplineError> + Send + Sync + 'static,
{
  pipeline: Arc<CorePipeline<TData, PipelineHandlerError>>,
  _phantom_app_err: PhantomData<fn() -> ApplicationError>,
}

#[async_trait]
impl<TData, PipelineHandlerError, ApplicationError> AnyPipelineRunner<ApplicationError>
  for PipelineWrapper<TData, PipelineHandlerError, ApplicationError>
where
  TData: 'static + Send + Sync,
  PipelineHandlerError: std::error::Error + From<SteplineError> + Send + Sync + 'static,
  ApplicationError: std::error::Error + From<PipelineHandlerError> + From<SteplineError> + Send + Sync + 'static,
{
  #[instrument(
        name = "PipelineWrapper::run_erased",
        skip_all,
        fields(target_tdata_type = %std::any::type_name::<TData>()),
        err(Display)
    )]
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<PipelineResult, ApplicationError> {
    let typed_ctx_data = match ctx_obj.downcast::<ContextData<TData>>() {
      Ok(boxed_ctx_data) => *boxed_ctx_data,
      Err(_) => {
        let expected_type_name = std::any::type_name::<ContextData<TData>>();
        event!(Level::ERROR, "Context object type mismatch. Expected {}.", expected_type_name);
        return Err(ApplicationError::from(SteplineError::TypeMismatch {
          step_name: "registry_dispatch".to_string(),
          expected_type: expected_type_name.to_string(),
        }));
      }
    };

    self.pipeline.run(typed_ctx_data).await.map_err(ApplicationError::from)
  }
}

/// The pipeline registry.
///
/// `ApplicationError` is the error type `Stepline::run` returns; it must be
/// constructible from `SteplineError` to report registry-level failures such
/// as a missing pipeline.
pub struct Stepline<ApplicationError = SteplineError>
where
  ApplicationError: std::error::Error + From<SteplineError> + Send + Sync + 'static,
{
  registry: RwLock<HashMap<TypeId, Arc<dyn AnyPipelineRunner<ApplicationError>>>>,
}

impl<ApplicationError> Stepline<ApplicationError>
where
  ApplicationError: std::error::Error + From<SteplineError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      registry: RwLock::new(HashMap::new()),
    }
  }

  /// Registers a pipeline for its context data type `TData`, replacing any
  /// pipeline previously registered for the same type.
  pub fn register_pipeline<TData, PipelineHandlerError>(&self, pipeline: CorePipeline<TData, PipelineHandlerError>)
  where
    TData: 'static + Send + Sync,
    PipelineHandlerError: std::error::Error + From<SteplineError> + Send + Sync + 'static,
    ApplicationError: From<PipelineHandlerError>,
  {
    event!(
      Level::DEBUG,
      tdata_type = %std::any::type_name::<TData>(),
      steps = ?pipeline.step_names(),
      "Registering pipeline."
    );
    let wrapper = PipelineWrapper::<TData, PipelineHandlerError, ApplicationError> {
      pipeline: Arc::new(pipeline),
      _phantom_app_err: PhantomData,
    };
    self.registry.write().insert(TypeId::of::<TData>(), Arc::new(wrapper));
  }

  pub fn is_registered<TData: 'static>(&self) -> bool {
    self.registry.read().contains_key(&TypeId::of::<TData>())
  }

  /// Runs the pipeline registered for the underlying data type `TData`.
  pub async fn run<TData>(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, ApplicationError>
  where
    TData: 'static + Send + Sync,
  {
    let type_id = TypeId::of::<TData>();
    let runner = self.registry.read().get(&type_id).cloned();

    let runner = runner.ok_or_else(|| {
      let type_name = std::any::type_name::<TData>();
      event!(Level::ERROR, "No pipeline registered for TData type {}.", type_name);
      ApplicationError::from(SteplineError::ConfigurationError {
        step_name: "Stepline::run".to_string(),
        message: format!("No pipeline registered for TData type {}", type_name),
      })
    })?;

    runner.run_erased(Box::new(ctx_data)).await
  }
}

impl<ApplicationError> Default for Stepline<ApplicationError>
where
  ApplicationError: std::error::Error + From<SteplineError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}
