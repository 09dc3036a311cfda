//! Remote job types
//!
//! A [`JobDescription`] is what the adapter hands to the remote client for
//! submission; a [`PollResponse`] is what the client reports back on each poll.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::run::{Placement, VmOptions};
use crate::domain::storage::StoragePath;
use crate::domain::task::{ExitInfo, TaskId};

/// Everything the remote service needs to run one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescription {
    pub task_id: TaskId,
    pub task_name: String,
    pub project_id: String,
    pub location: String,
    pub placement: Placement,
    pub machine_type: String,
    pub preemptible: bool,
    pub boot_disk_gb: u32,
    /// Size of the scratch disk mounted for the task work area
    pub disk_gb: u32,
    pub image: String,
    pub script: String,
    /// Remote directory holding this task's files
    pub work_dir: StoragePath,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub remote_bin_dir: Option<StoragePath>,
    pub environment: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub timeout_secs: Option<u64>,
    pub vm: VmOptions,
}

/// Remote operation status as seen by a single poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// Result of one poll of a remote operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollResponse {
    pub status: RemoteStatus,
    pub exit_info: Option<ExitInfo>,
}

impl PollResponse {
    pub fn pending() -> Self {
        Self {
            status: RemoteStatus::Pending,
            exit_info: None,
        }
    }

    pub fn running() -> Self {
        Self {
            status: RemoteStatus::Running,
            exit_info: None,
        }
    }

    pub fn succeeded(exit_code: i32) -> Self {
        Self {
            status: RemoteStatus::Succeeded,
            exit_info: Some(ExitInfo::succeeded(exit_code)),
        }
    }

    pub fn failed(exit_code: Option<i32>, message: impl Into<String>) -> Self {
        Self {
            status: RemoteStatus::Failed,
            exit_info: Some(ExitInfo::failed(exit_code, message)),
        }
    }
}
