// src/lib.rs

//! Stepline: an async, step-based workflow engine.
//!
//! A pipeline is an ordered list of named steps operating on a shared
//! `ContextData<T>`. Each step can carry `before`, `on` and `after` handlers,
//! may be optional or skipped by a predicate, and may register a compensator
//! that undoes its side effects when a later step fails.
//!
//! Pipelines are registered in a `Stepline` registry keyed by their context
//! type, so callers only need to build a context and call `run`.

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context::{Compensator, Handler};
pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::step::{SkipCondition, StepDef};

pub use crate::pipeline::definition::Pipeline;

pub use crate::error::{SteplineError, SteplineResult};

pub use crate::registry::Stepline;

/*
    Typical use:
    1. Define a context struct `MyCtx` for the process.
    2. Create a `Pipeline<MyCtx, MyError>` with its step definitions.
    3. Attach async handlers with `.on_root()`, `.before_root()`, `.after_root()`.
    4. For steps with external side effects, attach `.compensate_root()` so a
       later failure can undo them.
    5. Register the pipeline in a `Stepline<MyError>` and call
       `registry.run(ContextData::new(ctx)).await`.
*/
