//! Object store endpoints

use crate::LifeSciencesClient;
use crate::error::{ClientError, Result};
use gls_core::domain::storage::StoragePath;
use std::path::Path;
use tracing::debug;

impl LifeSciencesClient {
    /// Upload a local file to the given object path
    ///
    /// # Arguments
    /// * `local_path` - File to read
    /// * `dest` - Full object path to write, including the file name
    pub async fn upload_object(&self, local_path: &Path, dest: &StoragePath) -> Result<()> {
        if dest.object_name().is_empty() {
            return Err(ClientError::InvalidRequest(format!(
                "upload destination has no object name: {}",
                dest
            )));
        }

        let body = tokio::fs::read(local_path).await?;
        let url = format!("{}/upload/storage/v1/b/{}/o", self.storage_url, dest.bucket());
        debug!("Uploading {} ({} bytes) to {}", local_path.display(), body.len(), dest);

        let response = self
            .authorize(self.client.post(&url))
            .query(&[("uploadType", "media"), ("name", dest.object_name())])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await?;

        self.handle_empty_response(response).await
    }
}
