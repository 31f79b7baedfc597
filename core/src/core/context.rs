// src/core/context.rs

//! Boxed handler types stored by a pipeline.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use std::future::Future;
use std::pin::Pin;

/// Type alias for a pipeline step handler.
///
/// A handler takes a clone of the shared `ContextData<TData>` and returns a
/// future resolving to `Result<PipelineControl, Err>`.
///
/// Handlers must drop every lock guard obtained from the context before the
/// next `.await` point.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>>
    + Send
    + Sync,
>;

/// Type alias for a compensating action.
///
/// A compensator is armed once its step has finished and runs only when a
/// later step fails. It cannot stop the pipeline, it only reports whether the
/// undo succeeded.
pub type Compensator<TData, Err> =
  Box<dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<(), Err>> + Send>> + Send + Sync>;
