// tests/registry_tests.rs
mod common;

use common::*;
use stepline::{ContextData, Pipeline, PipelineControl, PipelineResult, Stepline, SteplineError};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct RegistryContextAlpha {
  val: String,
}
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct RegistryContextBeta {
  num: i32,
}

#[tokio::test]
async fn test_registry_run_correct_pipeline() {
  setup_tracing();
  let registry = Stepline::<TestError>::new();

  let mut p_alpha = Pipeline::<RegistryContextAlpha, TestError>::new(&[("alpha_task", false, None)]);
  p_alpha.on_root("alpha_task", |ctx: ContextData<RegistryContextAlpha>| {
    Box::pin(async move {
      ctx.write().val = "alpha_processed".to_string();
      Ok::<PipelineControl, SteplineError>(PipelineControl::Continue)
    })
  });
  registry.register_pipeline(p_alpha);

  let mut p_beta = Pipeline::<RegistryContextBeta, TestError>::new(&[("beta_task", false, None)]);
  p_beta.on_root("beta_task", |ctx: ContextData<RegistryContextBeta>| {
    Box::pin(async move {
      ctx.write().num = 100;
      Ok::<PipelineControl, SteplineError>(PipelineControl::Continue)
    })
  });
  registry.register_pipeline(p_beta);

  assert!(registry.is_registered::<RegistryContextAlpha>());
  assert!(registry.is_registered::<RegistryContextBeta>());

  let ctx_alpha = ContextData::new(RegistryContextAlpha::default());
  assert_eq!(registry.run(ctx_alpha.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx_alpha.read().val, "alpha_processed");

  let ctx_beta = ContextData::new(RegistryContextBeta::default());
  assert_eq!(registry.run(ctx_beta.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx_beta.read().num, 100);
}

#[tokio::test]
async fn test_registry_pipeline_not_found() {
  setup_tracing();
  let registry = Stepline::<TestError>::new();

  #[derive(Clone, Debug, Default)]
  struct UnregisteredContext;

  let result = registry.run(ContextData::new(UnregisteredContext)).await;

  match result {
    Err(TestError::Stepline(s)) => {
      assert!(s.contains("ConfigurationError"));
      assert!(s.contains("No pipeline registered"));
      assert!(s.contains("UnregisteredContext"));
    }
    other => panic!("Expected ConfigurationError for unregistered pipeline, got {:?}", other),
  }
}

#[tokio::test]
async fn test_registry_pipeline_itself_errors() {
  setup_tracing();
  let registry = Stepline::<TestError>::new();

  let mut p_alpha = Pipeline::<RegistryContextAlpha, TestError>::new(&[("alpha_fail", false, None)]);
  p_alpha.on_root("alpha_fail", |_ctx: ContextData<RegistryContextAlpha>| {
    Box::pin(async move { Err(TestError::Handler("Alpha pipeline failed".to_string())) })
  });
  registry.register_pipeline(p_alpha);

  let result = registry.run(ContextData::new(RegistryContextAlpha::default())).await;

  assert_eq!(result.unwrap_err(), TestError::Handler("Alpha pipeline failed".to_string()));
}

#[tokio::test]
async fn test_registry_reregistration_replaces_pipeline() {
  setup_tracing();
  let registry = Stepline::<SteplineError>::default();

  for label in ["first", "second"] {
    let mut pipeline = Pipeline::<RegistryContextAlpha, SteplineError>::new(&[("task", false, None)]);
    pipeline.on_root("task", move |ctx: ContextData<RegistryContextAlpha>| {
      Box::pin(async move {
        ctx.write().val = label.to_string();
        Ok::<_, SteplineError>(PipelineControl::Continue)
      })
    });
    registry.register_pipeline(pipeline);
  }

  let ctx = ContextData::new(RegistryContextAlpha::default());
  registry.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().val, "second");
}

#[tokio::test]
async fn test_context_data_clone_shares_data() {
  setup_tracing();
  let original_ctx = ContextData::new(TestContext {
    counter: 1,
    ..Default::default()
  });
  let cloned_ctx = original_ctx.clone();

  original_ctx.write().counter = 5;
  assert_eq!(cloned_ctx.read().counter, 5);

  cloned_ctx.write().counter = 10;
  assert_eq!(*original_ctx.map_read(|c| &c.counter), 10);

  drop(cloned_ctx);
  let inner = original_ctx.try_unwrap().expect("last handle");
  assert_eq!(inner.counter, 10);
}
