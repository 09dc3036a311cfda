//! Service layer
//!
//! Business logic of the executor: preflight validation of the run settings,
//! translation of tasks into remote job descriptions, and the adapter the host
//! engine talks to.

mod adapter;
mod job_builder;
mod validator;

pub use adapter::{ExecutorAdapter, LifeSciencesAdapter};
pub use job_builder::{DEFAULT_DISK_GB, DEFAULT_MACHINE_TYPE, TASK_WORKDIR_ENV, build_job};
pub use validator::{DEFAULT_BOOT_DISK_GB, DEFAULT_LOCATION, PreflightInput, validate};
