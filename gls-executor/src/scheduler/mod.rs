//! Scheduler layer
//!
//! Owns the lifecycle of submitted tasks: the per-task [`TaskHandle`] state
//! machine and the single [`PollingMonitor`] loop that advances every
//! outstanding handle until it is terminal.

pub mod handle;
pub mod poller;
pub mod task_watch;

pub use handle::TaskHandle;
pub use poller::{MonitorHandle, PollingMonitor};
pub use task_watch::TaskWatch;
