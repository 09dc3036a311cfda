//! Task handle
//!
//! Per-task lifecycle state. A handle is built by the adapter in `Created`
//! state and then moved into the polling monitor, which is the only code that
//! advances it:
//!
//! ```text
//! Created ──submit ok──▶ Submitted ──poll: running──▶ Running
//!    │                       │                          │
//!    └─submit error──▶ Aborted   └──poll: terminal──▶ Succeeded | Failed
//! ```
//!
//! Any non-terminal state moves to `Aborted` on shutdown.

use chrono::{DateTime, Utc};
use gls_core::domain::job::{JobDescription, PollResponse, RemoteStatus};
use gls_core::domain::task::{ExitInfo, TaskId, TaskSnapshot, TaskState};
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Tracking object for one task's remote execution
#[derive(Debug, Clone)]
pub struct TaskHandle {
    task_id: TaskId,
    job: JobDescription,
    state: TaskState,
    remote_operation_id: Option<String>,
    submit_time: Option<DateTime<Utc>>,
    last_poll_time: Option<DateTime<Utc>>,
    exit_info: Option<ExitInfo>,
    poll_count: u32,
    /// Earliest instant the next remote request for this handle may be sent
    next_request_at: Option<Instant>,
}

impl TaskHandle {
    pub fn new(job: JobDescription) -> Self {
        Self {
            task_id: job.task_id.clone(),
            job,
            state: TaskState::Created,
            remote_operation_id: None,
            submit_time: None,
            last_poll_time: None,
            exit_info: None,
            poll_count: 0,
            next_request_at: None,
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn job(&self) -> &JobDescription {
        &self.job
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn remote_operation_id(&self) -> Option<&str> {
        self.remote_operation_id.as_deref()
    }

    pub fn exit_info(&self) -> Option<&ExitInfo> {
        self.exit_info.as_ref()
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            task_id: self.task_id.clone(),
            state: self.state,
            remote_operation_id: self.remote_operation_id.clone(),
            submit_time: self.submit_time,
            last_poll_time: self.last_poll_time,
            exit_info: self.exit_info.clone(),
            poll_count: self.poll_count,
        }
    }

    /// Returns true if the handle needs a remote request at `now`
    ///
    /// Created handles are always due for submission. Submitted and running
    /// handles are due once the per-handle spacing since the last request has
    /// elapsed. Terminal handles are never due.
    pub(crate) fn is_due(&self, now: Instant) -> bool {
        match self.state {
            TaskState::Created => true,
            TaskState::Submitted | TaskState::Running => {
                self.next_request_at.is_none_or(|at| at <= now)
            }
            TaskState::Succeeded | TaskState::Failed | TaskState::Aborted => false,
        }
    }

    /// Created → Submitted
    pub(crate) fn mark_submitted(&mut self, operation_id: String, now: Instant, spacing: Duration) {
        if self.state != TaskState::Created {
            debug!("Ignoring submission of task {} in state {}", self.task_id, self.state);
            return;
        }

        info!("Task {} submitted as {}", self.task_id, operation_id);
        self.remote_operation_id = Some(operation_id);
        self.submit_time = Some(Utc::now());
        self.next_request_at = Some(now + spacing);
        self.state = TaskState::Submitted;
    }

    /// Created → Aborted after a failed submission
    pub(crate) fn mark_submit_failed(&mut self, error: &str) {
        if self.state != TaskState::Created {
            return;
        }

        warn!("Submission of task {} failed: {}", self.task_id, error);
        self.finish(
            TaskState::Aborted,
            ExitInfo::aborted(format!("submission failed: {}", error)),
        );
    }

    /// Applies one poll response
    ///
    /// Returns true if the state changed.
    pub(crate) fn record_poll(
        &mut self,
        response: PollResponse,
        now: Instant,
        spacing: Duration,
    ) -> bool {
        if !matches!(self.state, TaskState::Submitted | TaskState::Running) {
            debug!("Ignoring poll for task {} in state {}", self.task_id, self.state);
            return false;
        }

        self.poll_count += 1;
        self.last_poll_time = Some(Utc::now());
        self.next_request_at = Some(now + spacing);

        match response.status {
            RemoteStatus::Pending => false,
            RemoteStatus::Running => {
                if self.state == TaskState::Running {
                    return false;
                }
                info!("Task {} is running", self.task_id);
                self.state = TaskState::Running;
                true
            }
            RemoteStatus::Succeeded => {
                let exit = response.exit_info.unwrap_or_else(|| ExitInfo::succeeded(0));
                info!("Task {} succeeded (exit code {:?})", self.task_id, exit.exit_code);
                self.finish(TaskState::Succeeded, exit);
                true
            }
            RemoteStatus::Failed => {
                let exit = response
                    .exit_info
                    .unwrap_or_else(|| ExitInfo::failed(None, "remote operation failed"));
                info!(
                    "Task {} failed (exit code {:?}): {}",
                    self.task_id,
                    exit.exit_code,
                    exit.error_message.as_deref().unwrap_or("no error message")
                );
                self.finish(TaskState::Failed, exit);
                true
            }
        }
    }

    /// A poll attempt that got no answer; the state is left untouched
    pub(crate) fn record_poll_error(&mut self, error: &str, now: Instant, spacing: Duration) {
        debug!("Poll of task {} failed: {}", self.task_id, error);
        self.next_request_at = Some(now + spacing);
    }

    /// Created → Aborted for a submission that completed after shutdown
    ///
    /// The operation id is kept so the engine can see what was cancelled.
    pub(crate) fn abort_after_submit(&mut self, operation_id: String, reason: &str) {
        if self.state != TaskState::Created {
            return;
        }

        self.remote_operation_id = Some(operation_id);
        self.abort(reason);
    }

    /// Any non-terminal state → Aborted
    pub(crate) fn abort(&mut self, reason: &str) -> bool {
        if self.state.is_terminal() {
            return false;
        }

        info!("Task {} aborted: {}", self.task_id, reason);
        self.finish(TaskState::Aborted, ExitInfo::aborted(reason));
        true
    }

    fn finish(&mut self, state: TaskState, exit: ExitInfo) {
        self.state = state;
        self.exit_info = Some(exit);
        self.next_request_at = None;
    }
}
