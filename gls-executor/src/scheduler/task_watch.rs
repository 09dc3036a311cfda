//! Read-only view of an admitted task

use gls_core::domain::task::{TaskId, TaskSnapshot, TaskState};
use tokio::sync::watch;

/// Engine-side observer of one task handle
///
/// The polling monitor publishes a new snapshot on every transition and every
/// poll answer; the watch only ever reads them.
#[derive(Debug, Clone)]
pub struct TaskWatch {
    receiver: watch::Receiver<TaskSnapshot>,
}

impl TaskWatch {
    pub(crate) fn new(receiver: watch::Receiver<TaskSnapshot>) -> Self {
        Self { receiver }
    }

    pub fn task_id(&self) -> TaskId {
        self.receiver.borrow().task_id.clone()
    }

    pub fn state(&self) -> TaskState {
        self.receiver.borrow().state
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> TaskSnapshot {
        self.receiver.borrow().clone()
    }

    /// Waits for the next published snapshot
    ///
    /// Returns `None` once the monitor has stopped publishing for this task.
    pub async fn changed(&mut self) -> Option<TaskSnapshot> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Waits until the task reaches a terminal state
    ///
    /// If the monitor goes away without publishing a terminal snapshot, the
    /// last known snapshot is returned.
    pub async fn wait(&mut self) -> TaskSnapshot {
        loop {
            {
                let current = self.receiver.borrow_and_update();
                if current.state.is_terminal() {
                    return current.clone();
                }
            }

            if self.receiver.changed().await.is_err() {
                return self.receiver.borrow().clone();
            }
        }
    }
}
