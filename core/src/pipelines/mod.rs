// coursepay/src/pipelines/mod.rs

pub mod checkout_pipeline;
pub mod contexts;
pub mod return_pipeline;
pub mod sync_pipeline;

pub use checkout_pipeline::{build_checkout_pipeline, CheckoutRedirect};
pub use contexts::{CheckoutCtxData, FlowServices, ReturnCtxData, SyncCtxData};
pub use return_pipeline::{build_return_pipeline, ReturnOutcome, ReturnParams, UnresolvedReason};
pub use sync_pipeline::{build_sync_pipeline, SyncReport};
