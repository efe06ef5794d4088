//! # Concord Workflow
//!
//! Drives a [`WorkflowDefinition`] step by step against a
//! [`CheckpointManager`](concord_checkpoint::CheckpointManager).
//!
//! ## Guarantees
//!
//! - Steps run strictly in ascending step-number order; a step starts only
//!   after its predecessor's checkpoint is recorded
//! - Failed attempts are retried with exponential backoff; exhaustion records
//!   a `Failed` checkpoint and halts the workflow
//! - Cancellation is cooperative and reported as [`WorkflowError::Cancelled`],
//!   never as a generic failure
//! - `resume` replays completed steps' state and re-attempts the first
//!   step without a `Completed` checkpoint

pub mod context;
pub mod definition;
pub mod error;
pub mod executor;
mod executor_run;
pub mod result;
pub mod retry;
pub mod status;

pub use context::{WorkflowStepContext, WorkflowStepResult};
pub use definition::{StepHandler, WorkflowDefinition, WorkflowStepDefinition};
pub use error::WorkflowError;
pub use executor::{ExecutorConfig, WorkflowExecutor};
pub use result::WorkflowExecutionResult;
pub use retry::RetryPolicy;
pub use status::WorkflowStatus;

pub use tokio_util::sync::CancellationToken;
