// coursepay/src/pipeline/control.rs

//! Defines signals for controlling pipeline flow and the outcome of a pipeline run.

/// Signal from a step handler indicating whether the pipeline should continue or stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  /// Continue with the remaining handlers and steps.
  Continue,
  /// Halt the pipeline. The flow has reached a terminal state and recorded it
  /// in its context.
  Stop,
}

/// Outcome of a full pipeline execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineResult {
  /// Every step ran to completion.
  Completed,
  /// A handler returned `PipelineControl::Stop`.
  Stopped,
}
