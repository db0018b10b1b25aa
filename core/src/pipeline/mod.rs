// coursepay/src/pipeline/mod.rs

//! Named-step pipelines over a shared, lockable context. Checkout, return
//! reconciliation and purchase sync are each one pipeline.

pub mod context_data;
pub mod control;
pub mod definition;
pub mod execution;

pub use context_data::ContextData;
pub use control::{PipelineControl, PipelineResult};
pub use definition::{Handler, Pipeline, StepDef};
