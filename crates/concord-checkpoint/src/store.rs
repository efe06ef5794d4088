//! Checkpoint storage.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::checkpoint::WorkflowCheckpoint;
use crate::config::{CheckpointBackend, CheckpointConfig};
use crate::error::CheckpointError;

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

/// Checkpoint storage contract.
///
/// Every `save` appends; stores never reorder or deduplicate. Chains are
/// keyed by workflow ID and mutations are atomic per key.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Append a checkpoint to its workflow's chain.
    async fn save(&self, checkpoint: &WorkflowCheckpoint) -> Result<(), CheckpointError>;

    /// List a workflow's chain ordered by step number, append order within a step.
    async fn list_by_workflow(&self, workflow_id: &str) -> Result<Vec<WorkflowCheckpoint>, CheckpointError>;

    /// Remove a workflow's chain. Returns the number of checkpoints removed.
    async fn purge(&self, workflow_id: &str) -> Result<usize, CheckpointError>;

    /// Workflow IDs with a non-empty chain.
    async fn list_workflows(&self) -> Result<Vec<String>, CheckpointError>;
}

/// Build the store selected by configuration.
pub async fn open_store(config: &CheckpointConfig) -> Result<Arc<dyn CheckpointStore>, CheckpointError> {
    match config.backend {
        CheckpointBackend::Memory => Ok(Arc::new(MemoryCheckpointStore::new())),
        CheckpointBackend::File => Ok(Arc::new(FileCheckpointStore::new(&config.storage_path).await?)),
    }
}

/// In-memory checkpoint store.
pub struct MemoryCheckpointStore {
    chains: DashMap<String, Vec<WorkflowCheckpoint>>,
}

impl MemoryCheckpointStore {
    /// Create a new memory store.
    pub fn new() -> Self {
        Self {
            chains: DashMap::new(),
        }
    }
}

impl Default for MemoryCheckpointStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn save(&self, checkpoint: &WorkflowCheckpoint) -> Result<(), CheckpointError> {
        self.chains
            .entry(checkpoint.workflow_id.clone())
            .or_default()
            .push(checkpoint.clone());
        Ok(())
    }

    async fn list_by_workflow(&self, workflow_id: &str) -> Result<Vec<WorkflowCheckpoint>, CheckpointError> {
        let mut chain = self
            .chains
            .get(workflow_id)
            .map(|c| c.value().clone())
            .unwrap_or_default();
        // stable: append order survives within a step
        chain.sort_by_key(|cp| cp.step_number);
        Ok(chain)
    }

    async fn purge(&self, workflow_id: &str) -> Result<usize, CheckpointError> {
        Ok(self
            .chains
            .remove(workflow_id)
            .map(|(_, chain)| chain.len())
            .unwrap_or(0))
    }

    async fn list_workflows(&self) -> Result<Vec<String>, CheckpointError> {
        Ok(self
            .chains
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| entry.key().clone())
            .collect())
    }
}

/// File system based checkpoint store.
///
/// Checkpoints are stored as individual JSON files organized by workflow:
/// ```text
/// {storage_path}/
/// └── checkpoints/
///     └── {workflow_id}/
///         ├── {seq}_step_{step}.json
///         ├── {seq}_step_{step}.json
///         └── ...
/// ```
///
/// Appends to one workflow are serialized by a per-workflow lock; other
/// workflows proceed concurrently. Unreadable files fail the listing.
pub struct FileCheckpointStore {
    /// Base storage path.
    storage_path: PathBuf,
    /// Per-workflow append locks.
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl FileCheckpointStore {
    /// Create a new file-based checkpoint store.
    ///
    /// # Arguments
    /// * `storage_path` - Base directory for storing checkpoint files
    pub async fn new(storage_path: impl Into<PathBuf>) -> Result<Self, CheckpointError> {
        let storage_path = storage_path.into();
        fs::create_dir_all(storage_path.join("checkpoints")).await?;

        debug!("FileCheckpointStore initialized at {:?}", storage_path);

        Ok(Self {
            storage_path,
            locks: DashMap::new(),
        })
    }

    fn checkpoints_dir(&self) -> PathBuf {
        self.storage_path.join("checkpoints")
    }

    fn workflow_dir(&self, workflow_id: &str) -> PathBuf {
        self.checkpoints_dir().join(Self::sanitize_workflow_id(workflow_id))
    }

    fn lock_for(&self, workflow_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(workflow_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Sanitize workflow ID for use as directory name.
    fn sanitize_workflow_id(workflow_id: &str) -> String {
        workflow_id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect()
    }

    fn file_name(seq: u64, step_number: u32) -> String {
        format!("{:06}_step_{:06}.json", seq, step_number)
    }

    /// Parse append sequence and step number from filename.
    fn parse_filename(filename: &str) -> Option<(u64, u32)> {
        // Format: {seq}_step_{step}.json
        let stem = filename.strip_suffix(".json")?;
        let (seq, step) = stem.split_once("_step_")?;
        Some((seq.parse().ok()?, step.parse().ok()?))
    }

    /// Checkpoint files in a workflow directory with their parsed keys.
    async fn entries(&self, workflow_id: &str) -> Result<Vec<(u64, u32, PathBuf)>, CheckpointError> {
        let dir = self.workflow_dir(workflow_id);
        if !fs::try_exists(&dir).await? {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(&dir).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some((seq, step)) = Self::parse_filename(name) {
                entries.push((seq, step, path));
            }
        }
        Ok(entries)
    }

    async fn read_checkpoint(path: &PathBuf) -> Result<WorkflowCheckpoint, CheckpointError> {
        let content = fs::read_to_string(path).await?;
        serde_json::from_str(&content).map_err(|e| {
            CheckpointError::InvalidData(format!("{}: {}", path.display(), e))
        })
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn save(&self, checkpoint: &WorkflowCheckpoint) -> Result<(), CheckpointError> {
        let lock = self.lock_for(&checkpoint.workflow_id);
        let _guard = lock.lock().await;

        let dir = self.workflow_dir(&checkpoint.workflow_id);
        fs::create_dir_all(&dir).await?;

        let seq = self
            .entries(&checkpoint.workflow_id)
            .await?
            .iter()
            .map(|(seq, _, _)| seq + 1)
            .max()
            .unwrap_or(0);

        let content = serde_json::to_string_pretty(checkpoint).map_err(|e| {
            CheckpointError::Serialization(format!("Failed to serialize checkpoint: {}", e))
        })?;

        // write-then-rename so a crash never leaves a half-written checkpoint
        let path = dir.join(Self::file_name(seq, checkpoint.step_number));
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &path).await?;

        debug!(
            "Saved checkpoint '{}' for workflow '{}' at step {} to {:?}",
            checkpoint.id, checkpoint.workflow_id, checkpoint.step_number, path
        );
        Ok(())
    }

    async fn list_by_workflow(&self, workflow_id: &str) -> Result<Vec<WorkflowCheckpoint>, CheckpointError> {
        let mut entries = self.entries(workflow_id).await?;
        entries.sort_by_key(|(seq, step, _)| (*step, *seq));

        let mut chain = Vec::with_capacity(entries.len());
        for (_, _, path) in entries {
            let checkpoint = Self::read_checkpoint(&path).await?;
            // distinct IDs can sanitize to the same directory
            if checkpoint.workflow_id == workflow_id {
                chain.push(checkpoint);
            }
        }
        Ok(chain)
    }

    async fn purge(&self, workflow_id: &str) -> Result<usize, CheckpointError> {
        let lock = self.lock_for(workflow_id);
        let _guard = lock.lock().await;

        let chain = self.list_by_workflow(workflow_id).await?;
        let dir = self.workflow_dir(workflow_id);
        let total = self.entries(workflow_id).await?.len();

        if total == chain.len() {
            if fs::try_exists(&dir).await? {
                fs::remove_dir_all(&dir).await?;
            }
        } else {
            for (_, _, path) in self.entries(workflow_id).await? {
                if Self::read_checkpoint(&path).await?.workflow_id == workflow_id {
                    fs::remove_file(&path).await?;
                }
            }
        }

        debug!("Deleted {} checkpoints for workflow '{}'", chain.len(), workflow_id);
        Ok(chain.len())
    }

    async fn list_workflows(&self) -> Result<Vec<String>, CheckpointError> {
        let dir = self.checkpoints_dir();
        if !fs::try_exists(&dir).await? {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        let mut workflows = fs::read_dir(&dir).await?;
        while let Some(entry) = workflows.next_entry().await? {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let mut files = fs::read_dir(&path).await?;
            while let Some(file) = files.next_entry().await? {
                let file_path = file.path();
                let parsed = file_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .and_then(Self::parse_filename);
                if parsed.is_none() {
                    continue;
                }
                let checkpoint = Self::read_checkpoint(&file_path).await?;
                if !ids.contains(&checkpoint.workflow_id) {
                    ids.push(checkpoint.workflow_id);
                }
            }
        }
        Ok(ids)
    }
}
