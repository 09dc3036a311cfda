//! Executor error types

use thiserror::Error;

/// Fatal preflight error; the run is aborted when one is raised
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Working directory is not a remote storage path
    #[error(
        "Executor `google-lifesciences` requires a Google Storage bucket as working directory, \
         found `{work_dir}` -- specify a `gs://<bucket>/<path>` work dir"
    )]
    WorkDirNotRemote { work_dir: String },

    /// A required setting is absent or empty
    #[error("Missing required config value `{key}`")]
    MissingSetting { key: String },

    /// Both placement settings are present
    #[error(
        "You can't specify both `gcp.zone` and `gcp.region` configuration parameters -- \
         please remove one of them from your configuration"
    )]
    ZoneAndRegion,

    /// Neither placement setting is present
    #[error("Missing configuration value `gcp.zone` or `gcp.region` -- specify exactly one of them")]
    NoZoneOrRegion,

    /// A setting is present but cannot be interpreted
    #[error("Invalid value for config `{key}`: {reason}")]
    InvalidSetting { key: String, reason: String },

    /// Uploading the auxiliary binaries failed
    #[error("Failed to stage auxiliary binary `{path}`: {reason}")]
    StagingFailed { path: String, reason: String },
}

impl ConfigError {
    /// Setting key the error is about, when it names one
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::MissingSetting { key } | Self::InvalidSetting { key, .. } => Some(key),
            _ => None,
        }
    }
}

/// Errors raised by the adapter's handler factory
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// `register()` has not completed
    #[error("Adapter used before register() completed")]
    NotRegistered,

    /// `register()` failed; the run is aborted
    #[error("Adapter registration failed: {0}")]
    Config(#[from] ConfigError),
}

/// Failure reported by the remote job client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Network or service hiccup; the same call may succeed later
    #[error("transient remote error: {0}")]
    Transient(String),

    /// The service answered and refused the request
    #[error("remote service rejected the request: {0}")]
    Rejected(String),
}

impl RemoteError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<gls_client::ClientError> for RemoteError {
    fn from(err: gls_client::ClientError) -> Self {
        if err.is_retryable() {
            Self::Transient(err.to_string())
        } else {
            Self::Rejected(err.to_string())
        }
    }
}

/// Operational errors of the polling monitor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    /// The monitor no longer admits handles
    #[error("Polling monitor has been shut down")]
    ShutDown,

    /// The remote service could not be reached for too many consecutive passes
    #[error("Remote service unreachable for {consecutive_failures} consecutive poll passes")]
    RemoteUnavailable { consecutive_failures: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use gls_client::ClientError;

    #[test]
    fn test_missing_setting_names_key() {
        let err = ConfigError::MissingSetting {
            key: "gcp.project".to_string(),
        };
        assert_eq!(err.key(), Some("gcp.project"));
        assert!(err.to_string().contains("required config value `gcp.project`"));
    }

    #[test]
    fn test_placement_errors_are_distinct() {
        let both = ConfigError::ZoneAndRegion.to_string();
        let neither = ConfigError::NoZoneOrRegion.to_string();
        assert_ne!(both, neither);
        assert!(both.contains("both"));
        assert!(neither.contains("Missing"));
    }

    #[test]
    fn test_client_error_classification() {
        let transient: RemoteError = ClientError::api_error(503, "unavailable").into();
        assert!(transient.is_transient());

        let rejected: RemoteError = ClientError::api_error(400, "bad machine type").into();
        assert!(!rejected.is_transient());
    }
}
