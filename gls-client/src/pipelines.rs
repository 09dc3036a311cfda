//! Pipeline operation endpoints

use crate::LifeSciencesClient;
use crate::error::Result;
use gls_core::dto::operation::Operation;
use gls_core::dto::pipeline::RunPipelineRequest;
use tracing::debug;

impl LifeSciencesClient {
    // =============================================================================
    // Pipeline Operations
    // =============================================================================

    /// Start a pipeline
    ///
    /// # Arguments
    /// * `project` - Project the pipeline is billed to
    /// * `location` - API location, e.g. `us-central1`
    /// * `req` - The pipeline to run
    ///
    /// # Returns
    /// The long-running operation created for the pipeline
    pub async fn run_pipeline(
        &self,
        project: &str,
        location: &str,
        req: &RunPipelineRequest,
    ) -> Result<Operation> {
        let url = format!(
            "{}/v2beta/projects/{}/locations/{}/pipelines:run",
            self.api_url, project, location
        );
        debug!("POST {}", url);
        let response = self.authorize(self.client.post(&url)).json(req).send().await?;

        self.handle_response(response).await
    }

    /// Get an operation by name
    ///
    /// # Arguments
    /// * `name` - Fully qualified operation name as returned by [`run_pipeline`](Self::run_pipeline)
    pub async fn get_operation(&self, name: &str) -> Result<Operation> {
        let url = format!("{}/v2beta/{}", self.api_url, name);
        let response = self.authorize(self.client.get(&url)).send().await?;

        self.handle_response(response).await
    }

    /// Request cancellation of an operation
    ///
    /// The service acknowledges the request; the operation finishes
    /// asynchronously.
    pub async fn cancel_operation(&self, name: &str) -> Result<()> {
        let url = format!("{}/v2beta/{}:cancel", self.api_url, name);
        let response = self
            .authorize(self.client.post(&url))
            .json(&serde_json::json!({}))
            .send()
            .await?;

        self.handle_empty_response(response).await
    }
}
