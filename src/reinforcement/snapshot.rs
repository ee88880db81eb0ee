// Versioned persistence for the learned model
// Replaces an opaque binary dump with an explicit JSON document so schema
// drift degrades to a fresh model instead of corrupt state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::error::{DishaError, DishaResult};
use crate::reinforcement::learner::LearningMetrics;
use crate::reinforcement::q_learning::PolicyEntry;

/// Current snapshot schema version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serialized form of the learner's durable state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub version: u32,
    pub policy: Vec<PolicyEntry>,
    pub epsilon: f64,
    pub metrics: LearningMetrics,
    pub reward_history: Vec<f64>,
    pub saved_at: DateTime<Utc>,
}

impl ModelSnapshot {
    pub fn to_json(&self) -> DishaResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse a snapshot, rejecting unknown schema versions
    pub fn from_json(bytes: &[u8]) -> DishaResult<Self> {
        let snapshot: ModelSnapshot = serde_json::from_slice(bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(DishaError::snapshot_error(format!(
                "unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        Ok(snapshot)
    }
}

/// Durable blob storage for model snapshots
///
/// Injected into the learner so tests can substitute an in-memory fake.
pub trait SnapshotStore: Send + Sync {
    /// Persist a snapshot blob
    fn persist(&self, blob: &[u8]) -> DishaResult<()>;

    /// Load the last persisted blob, `None` if nothing was ever stored
    fn load(&self) -> DishaResult<Option<Vec<u8>>>;
}

/// Snapshot store writing a single JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl SnapshotStore for JsonFileStore {
    fn persist(&self, blob: &[u8]) -> DishaResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, blob)?;
        info!("Model snapshot saved to {}", self.path.display());
        Ok(())
    }

    fn load(&self) -> DishaResult<Option<Vec<u8>>> {
        if !self.path.exists() {
            debug!("No snapshot at {}, starting fresh", self.path.display());
            return Ok(None);
        }
        Ok(Some(std::fs::read(&self.path)?))
    }
}

/// In-memory snapshot store for tests and ephemeral deployments
#[derive(Debug, Default)]
pub struct MemoryStore {
    blob: Mutex<Option<Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-load a blob, e.g. a corrupt one for failure-path tests
    pub fn with_blob(blob: Vec<u8>) -> Self {
        Self {
            blob: Mutex::new(Some(blob)),
        }
    }
}

impl SnapshotStore for MemoryStore {
    fn persist(&self, blob: &[u8]) -> DishaResult<()> {
        let mut slot = self
            .blob
            .lock()
            .map_err(|e| DishaError::lock_error(e.to_string()))?;
        *slot = Some(blob.to_vec());
        Ok(())
    }

    fn load(&self) -> DishaResult<Option<Vec<u8>>> {
        let slot = self
            .blob
            .lock()
            .map_err(|e| DishaError::lock_error(e.to_string()))?;
        Ok(slot.clone())
    }
}
