//! Long-running operation DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provider-side long-running operation resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Fully qualified operation name, used as the remote operation id
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub metadata: Option<OperationMetadata>,
    #[serde(default)]
    pub error: Option<OperationError>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMetadata {
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub container_stopped: Option<ContainerStoppedEvent>,
    #[serde(default)]
    pub failed: Option<FailedEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStoppedEvent {
    pub action_id: i32,
    pub exit_status: i32,
    #[serde(default)]
    pub stderr: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedEvent {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub cause: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationError {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_running_operation() {
        let op: Operation = serde_json::from_str(
            r#"{
                "name": "projects/p1/locations/us-central1/operations/42",
                "metadata": {
                    "startTime": "2024-05-01T10:00:00Z",
                    "events": [{"timestamp": "2024-05-01T10:00:05Z", "description": "Worker assigned"}]
                }
            }"#,
        )
        .unwrap();

        assert!(!op.done);
        assert!(op.error.is_none());
        let metadata = op.metadata.unwrap();
        assert!(metadata.start_time.is_some());
        assert_eq!(metadata.events.len(), 1);
    }

    #[test]
    fn test_deserialize_failed_operation() {
        let op: Operation = serde_json::from_str(
            r#"{
                "name": "operations/7",
                "done": true,
                "error": {"code": 9, "message": "Execution failed"},
                "metadata": {"events": [{"containerStopped": {"actionId": 2, "exitStatus": 127}}]}
            }"#,
        )
        .unwrap();

        assert!(op.done);
        assert_eq!(op.error.unwrap().code, 9);
        let stopped = op.metadata.unwrap().events[0].container_stopped.clone().unwrap();
        assert_eq!(stopped.exit_status, 127);
    }
}
