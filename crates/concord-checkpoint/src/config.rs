//! Checkpoint configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which store backs the checkpoint chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointBackend {
    Memory,
    #[default]
    File,
}

/// Checkpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Store backend.
    #[serde(default)]
    pub backend: CheckpointBackend,

    /// Storage path for the file backend.
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,
}

fn default_storage_path() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".concord").join("checkpoints"))
        .unwrap_or_else(|| PathBuf::from("/tmp/concord/checkpoints"))
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            backend: CheckpointBackend::default(),
            storage_path: default_storage_path(),
        }
    }
}

impl CheckpointConfig {
    pub fn memory() -> Self {
        Self {
            backend: CheckpointBackend::Memory,
            ..Default::default()
        }
    }

    pub fn file(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            backend: CheckpointBackend::File,
            storage_path: storage_path.into(),
        }
    }
}
