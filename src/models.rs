//! Data shapes exchanged with the process manager.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of a worker pool, as known to the manager.
pub type PoolName = String;

/// Lifecycle state of one worker process.
///
/// Values are fixed by the manager; anything unrecognized decodes as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Inactive,
    Ready,
    Working,
    Invalid,
    Stopping,
    Stopped,
    Errored,
    Destroyed,
    #[serde(other)]
    Unknown,
}

impl WorkerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Ready => "ready",
            Self::Working => "working",
            Self::Invalid => "invalid",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Errored => "errored",
            Self::Destroyed => "destroyed",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time state of one worker process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub pid: u32,
    pub status: WorkerStatus,
    /// Jobs executed by this worker since it started.
    #[serde(rename = "numExecs")]
    pub num_jobs: u64,
    /// Resident memory in bytes.
    #[serde(rename = "memoryUsage")]
    pub memory_usage: u64,
    #[serde(with = "chrono::serde::ts_nanoseconds")]
    pub created: DateTime<Utc>,
}

/// Workers of one pool, in the order the manager listed them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    #[serde(default)]
    pub workers: Vec<WorkerRecord>,
}

impl PoolSnapshot {
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }
}
