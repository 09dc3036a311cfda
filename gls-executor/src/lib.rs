//! Remote task lifecycle manager for the Google Life Sciences pipelines service
//!
//! Architecture:
//! - Settings: read-only run settings navigated by dotted keys
//! - Service: preflight validation, job construction, and the engine-facing adapter
//! - Repository: the remote job client seam and its HTTP implementation
//! - Scheduler: task handles and the shared polling monitor
//!
//! The host engine registers the adapter once per run, obtains one
//! [`TaskHandle`] per task, and admits it to the [`PollingMonitor`], which
//! submits it and polls it until the remote service reports a terminal state.

pub mod config;
pub mod error;
pub mod repository;
pub mod scheduler;
pub mod service;
pub mod session;
pub mod settings;

pub use config::MonitorConfig;
pub use error::{AdapterError, ConfigError, MonitorError, RemoteError};
pub use repository::{LifeSciencesJobClient, RemoteJobClient};
pub use scheduler::{MonitorHandle, PollingMonitor, TaskHandle, TaskWatch};
pub use service::{ExecutorAdapter, LifeSciencesAdapter};
pub use session::{LocalSession, RunSession};
pub use settings::RunSettings;
