//! Task domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque task identifier handed over by the workflow engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Abstract task as produced by the engine
///
/// Only the parts needed to build a remote job description are modelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDescription {
    pub id: TaskId,
    pub name: String,
    /// Container image the task command runs in
    pub image: String,
    /// Shell script executed inside the container
    pub script: String,
    /// Remote-storage paths staged into the task work area before the script runs
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Files (relative to the task work area) copied back to the task work dir
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub resources: ResourceRequest,
}

/// Compute resources requested by a task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequest {
    pub cpus: Option<u32>,
    pub memory_mb: Option<u64>,
    pub disk_gb: Option<u32>,
    /// Explicit machine type, used when no memory is requested
    pub machine_type: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Lifecycle state of a task handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    Created,
    Submitted,
    Running,
    Succeeded,
    Failed,
    Aborted,
}

impl TaskState {
    /// Returns true once no further transitions can occur.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Aborted)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Submitted => "submitted",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Structured result attached to a handle in a terminal state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitInfo {
    pub exit_code: Option<i32>,
    pub error_message: Option<String>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl ExitInfo {
    pub fn succeeded(exit_code: i32) -> Self {
        Self {
            exit_code: Some(exit_code),
            error_message: None,
            completed_at: Some(chrono::Utc::now()),
        }
    }

    pub fn failed(exit_code: Option<i32>, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            error_message: Some(message.into()),
            completed_at: Some(chrono::Utc::now()),
        }
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::failed(None, message)
    }
}

/// Read-only view of a task handle published to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub task_id: TaskId,
    pub state: TaskState,
    pub remote_operation_id: Option<String>,
    pub submit_time: Option<chrono::DateTime<chrono::Utc>>,
    pub last_poll_time: Option<chrono::DateTime<chrono::Utc>>,
    pub exit_info: Option<ExitInfo>,
    /// Number of poll responses received from the remote service
    pub poll_count: u32,
}
