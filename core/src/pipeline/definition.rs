// coursepay/src/pipeline/definition.rs

//! Contains the `Pipeline<TData, Err>` struct definition and handler registration.

use crate::error::PipelineError;
use crate::pipeline::context_data::ContextData;
use crate::pipeline::control::PipelineControl;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

/// Type alias for a pipeline step handler.
///
/// A handler is an asynchronous function that takes a clone of the flow's
/// `ContextData<TData>` and resolves to `Result<PipelineControl, Err>`.
///
/// Handlers are responsible for:
/// 1. Copying what they need out of the context under a short-lived lock.
/// 2. **Dropping every lock guard BEFORE any `.await` suspension point.**
/// 3. Writing their results back into the context.
/// 4. Returning `PipelineControl::Stop` once the flow has reached a terminal state.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>>
    + Send
    + Sync,
>;

/// Definition of a pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDef {
  pub name: String,
  /// An optional step may have no handlers, and a failure inside it is logged
  /// instead of aborting the run.
  pub optional: bool,
}

/// An ordered list of named steps run against one shared context.
///
/// `Err` must be `From<PipelineError>` so that framework failures (a required
/// step without handlers, a missing context value) surface through the same
/// error type the handlers use.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<PipelineError> + Send + Sync + 'static,
{
  pub(crate) steps: Vec<StepDef>,
  pub(crate) on: HashMap<String, Vec<Handler<TData, Err>>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<PipelineError> + Send + Sync + 'static,
{
  /// Creates a new `Pipeline` from `(step_name, optional)` pairs.
  pub fn new(step_defs: &[(&str, bool)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(name, optional)| StepDef {
        name: (*name).to_string(),
        optional: *optional,
      })
      .collect();

    Self {
      steps,
      on: HashMap::new(),
    }
  }

  /// Panics if the step does not exist. Registering against an unknown step is
  /// a setup bug (a typo in a step name), not a runtime condition.
  fn ensure_step_exists(&self, step_name: &str) {
    if !self.steps.iter().any(|s| s.name == step_name) {
      panic!("Pipeline setup error: Step '{}' not found in pipeline definition.", step_name);
    }
  }

  /// Registers an `on` handler for a given step.
  ///
  /// The handler's own error type only has to convert into the pipeline's `Err`.
  pub fn on_root<F, UserProvidedErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, UserProvidedErr>> + Send + 'static,
    UserProvidedErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    let final_handler: Handler<TData, Err> = Box::new(move |ctx_data| {
      let user_fut = handler_fn(ctx_data);
      Box::pin(async move { user_fut.await.map_err(Into::into) })
    });
    self.on.entry(step_name.to_string()).or_default().push(final_handler);
  }
}
