//! Executor adapter
//!
//! The capability interface the host engine calls: one `register` per run,
//! then one task handler per task.

use async_trait::async_trait;
use gls_core::domain::run::RunConfiguration;
use gls_core::domain::task::TaskDescription;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::{AdapterError, ConfigError};
use crate::repository::RemoteJobClient;
use crate::scheduler::TaskHandle;
use crate::service::{PreflightInput, build_job, validate};
use crate::session::RunSession;
use crate::settings::{RunSettings, keys};

/// Interface between the host engine and a remote executor
#[async_trait]
pub trait ExecutorAdapter: Send + Sync {
    /// Validates the run once and returns the shared configuration
    ///
    /// Later calls return the cached outcome without validating again. A
    /// failure aborts the run session.
    async fn register(&self) -> Result<Arc<RunConfiguration>, ConfigError>;

    /// Builds the handle for one task; no remote call is made
    fn create_task_handler(&self, task: &TaskDescription) -> Result<TaskHandle, AdapterError>;

    /// Remote working directory of the run
    fn working_directory(&self) -> String;

    /// True when the engine must not assume a filesystem shared with the tasks
    fn is_container_native(&self) -> bool {
        true
    }
}

/// Adapter for the Life Sciences pipelines service
pub struct LifeSciencesAdapter {
    settings: RunSettings,
    session: Arc<dyn RunSession>,
    client: Arc<dyn RemoteJobClient>,
    local_bin_dir: Option<PathBuf>,
    config: OnceCell<Result<Arc<RunConfiguration>, ConfigError>>,
}

impl LifeSciencesAdapter {
    pub fn new(
        settings: RunSettings,
        session: Arc<dyn RunSession>,
        client: Arc<dyn RemoteJobClient>,
    ) -> Self {
        Self {
            settings,
            session,
            client,
            local_bin_dir: None,
            config: OnceCell::new(),
        }
    }

    /// Sets the local directory of auxiliary binaries to stage at registration
    pub fn with_local_bin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.local_bin_dir = Some(dir.into());
        self
    }

    /// Configuration built by a successful `register`
    pub fn configuration(&self) -> Option<Arc<RunConfiguration>> {
        self.config.get().and_then(|result| result.as_ref().ok().cloned())
    }

    async fn preflight(&self) -> Result<Arc<RunConfiguration>, ConfigError> {
        let work_dir = self.working_directory();
        info!("Validating run configuration (work dir: {})", work_dir);

        let input = PreflightInput {
            settings: &self.settings,
            work_dir: &work_dir,
            local_bin_dir: self.local_bin_dir.as_deref(),
        };

        match validate(input, self.client.as_ref()).await {
            Ok(config) => {
                info!(
                    "Executor registered for project {} in {}",
                    config.project_id, config.location
                );
                Ok(Arc::new(config))
            }
            Err(err) => {
                self.session.abort(&err.to_string());
                Err(err)
            }
        }
    }
}

#[async_trait]
impl ExecutorAdapter for LifeSciencesAdapter {
    async fn register(&self) -> Result<Arc<RunConfiguration>, ConfigError> {
        self.config
            .get_or_init(|| self.preflight())
            .await
            .clone()
    }

    fn create_task_handler(&self, task: &TaskDescription) -> Result<TaskHandle, AdapterError> {
        let config = match self.config.get() {
            Some(Ok(config)) => config,
            Some(Err(err)) => return Err(AdapterError::Config(err.clone())),
            None => return Err(AdapterError::NotRegistered),
        };

        debug!("Creating task handler for {}", task.id);
        Ok(TaskHandle::new(build_job(config, task)))
    }

    fn working_directory(&self) -> String {
        self.settings
            .get_str(keys::WORK_DIR)
            .unwrap_or_else(|| self.session.work_dir())
    }
}
