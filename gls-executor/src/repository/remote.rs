//! Remote job client
//!
//! Handles communication with the remote batch service:
//! - Submitting job descriptions
//! - Polling operation status
//! - Cancelling operations
//! - Staging local files into remote storage

use async_trait::async_trait;
use gls_client::{LifeSciencesClient, poll_response, run_request};
use gls_core::domain::job::{JobDescription, PollResponse};
use gls_core::domain::storage::StoragePath;
use std::path::Path;
use tracing::debug;

use crate::error::RemoteError;

/// Interface to the remote execution service
#[async_trait]
pub trait RemoteJobClient: Send + Sync {
    /// Submits a job and returns the remote operation id
    async fn submit(&self, job: &JobDescription) -> Result<String, RemoteError>;

    /// Queries the current status of an operation
    async fn poll(&self, operation_id: &str) -> Result<PollResponse, RemoteError>;

    /// Requests cancellation of an operation
    async fn cancel(&self, operation_id: &str) -> Result<(), RemoteError>;

    /// Uploads one local file into a remote directory
    ///
    /// # Returns
    /// The remote path of the uploaded file
    async fn stage_file(
        &self,
        local_path: &Path,
        remote_dir: &StoragePath,
    ) -> Result<StoragePath, RemoteError>;
}

/// HTTP implementation of RemoteJobClient
pub struct LifeSciencesJobClient {
    client: LifeSciencesClient,
}

impl LifeSciencesJobClient {
    pub fn new(client: LifeSciencesClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteJobClient for LifeSciencesJobClient {
    async fn submit(&self, job: &JobDescription) -> Result<String, RemoteError> {
        let request = run_request(job);
        let operation = self
            .client
            .run_pipeline(&job.project_id, &job.location, &request)
            .await?;

        debug!("Task {} submitted as {}", job.task_id, operation.name);
        Ok(operation.name)
    }

    async fn poll(&self, operation_id: &str) -> Result<PollResponse, RemoteError> {
        let operation = self.client.get_operation(operation_id).await?;
        Ok(poll_response(&operation))
    }

    async fn cancel(&self, operation_id: &str) -> Result<(), RemoteError> {
        self.client.cancel_operation(operation_id).await?;
        Ok(())
    }

    async fn stage_file(
        &self,
        local_path: &Path,
        remote_dir: &StoragePath,
    ) -> Result<StoragePath, RemoteError> {
        let file_name = local_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                RemoteError::Rejected(format!("not a file name: {}", local_path.display()))
            })?;

        let dest = remote_dir.join(file_name);
        self.client.upload_object(local_path, &dest).await?;
        Ok(dest)
    }
}
