//! Host run session
//!
//! The slice of the host engine the executor depends on: the run's generic
//! working directory and the abort signal raised on fatal configuration errors.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::error;

/// Run-level services provided by the host engine
pub trait RunSession: Send + Sync {
    /// Generic working directory of the run
    fn work_dir(&self) -> String;

    /// Marks the run aborted so that no further tasks are scheduled
    fn abort(&self, reason: &str);

    fn is_aborted(&self) -> bool;
}

/// Stand-alone session used by the binary driver and tests
pub struct LocalSession {
    work_dir: String,
    aborted: AtomicBool,
    reason: Mutex<Option<String>>,
}

impl LocalSession {
    pub fn new(work_dir: impl Into<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            aborted: AtomicBool::new(false),
            reason: Mutex::new(None),
        }
    }

    /// Reason given by the first abort, if any
    pub fn abort_reason(&self) -> Option<String> {
        self.reason.lock().ok().and_then(|reason| reason.clone())
    }
}

impl RunSession for LocalSession {
    fn work_dir(&self) -> String {
        self.work_dir.clone()
    }

    fn abort(&self, reason: &str) {
        if self.aborted.swap(true, Ordering::SeqCst) {
            return;
        }
        error!("Run aborted: {}", reason);
        if let Ok(mut slot) = self.reason.lock() {
            *slot = Some(reason.to_string());
        }
    }

    fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_abort_reason_wins() {
        let session = LocalSession::new("gs://bucket/work");
        assert!(!session.is_aborted());

        session.abort("missing project");
        session.abort("second");

        assert!(session.is_aborted());
        assert_eq!(session.abort_reason().as_deref(), Some("missing project"));
    }
}
