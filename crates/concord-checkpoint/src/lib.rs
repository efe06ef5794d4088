//! # Concord Checkpoint
//!
//! Durable, append-only record of per-step workflow outcomes.
//!
//! ## Features
//!
//! - One checkpoint per attempted step outcome, ordered by step number
//! - Keyed isolation: chains of different workflows never interleave
//! - In-memory and JSON-file stores behind one [`CheckpointStore`] contract
//! - [`ResumePlan`] replay of completed steps for workflow resumption

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod recovery;
pub mod store;

pub use checkpoint::{CheckpointManager, CheckpointStatus, WorkflowCheckpoint};
pub use config::{CheckpointBackend, CheckpointConfig};
pub use error::CheckpointError;
pub use recovery::ResumePlan;
pub use store::{open_store, CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
