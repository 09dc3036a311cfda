//! Scripted in-memory remote client for tests

use async_trait::async_trait;
use gls_core::domain::job::{JobDescription, PollResponse};
use gls_core::domain::run::{Placement, RunConfiguration, VmOptions};
use gls_core::domain::storage::StoragePath;
use gls_core::domain::task::{TaskDescription, TaskId};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio::time::Instant;

use super::RemoteJobClient;
use crate::error::RemoteError;
use crate::service::build_job;

pub(crate) fn sample_config() -> RunConfiguration {
    RunConfiguration {
        project_id: "p1".to_string(),
        location: "us-central1".to_string(),
        placement: Placement::Zones(vec!["z1".to_string()]),
        work_dir: StoragePath::parse("gs://bucket/work").unwrap(),
        remote_bin_directory: None,
        preemptible: false,
        boot_disk_gb: 10,
        vm: VmOptions::default(),
    }
}

pub(crate) fn sample_task(task_id: &str) -> TaskDescription {
    TaskDescription {
        id: TaskId::new(task_id),
        name: format!("task {}", task_id),
        image: "ubuntu:22.04".to_string(),
        script: "echo hello".to_string(),
        inputs: vec![],
        outputs: vec![],
        resources: Default::default(),
    }
}

pub(crate) fn sample_job(task_id: &str) -> JobDescription {
    build_job(&sample_config(), &sample_task(task_id))
}

/// Remote client whose answers are scripted per operation
///
/// Operation ids are `operations/<task id>`. Once an operation's script is
/// exhausted every further poll answers `Running`.
#[derive(Default)]
pub(crate) struct ScriptedClient {
    state: Mutex<Script>,
}

#[derive(Default)]
struct Script {
    polls: HashMap<String, VecDeque<Result<PollResponse, RemoteError>>>,
    submit_errors: HashMap<String, RemoteError>,
    submit_gates: HashMap<String, Arc<Notify>>,
    hung: HashSet<String>,
    fail_staging: bool,
    cancel_error: Option<RemoteError>,
    submitted: Vec<(String, Instant)>,
    poll_log: Vec<(String, Instant)>,
    cancelled: Vec<String>,
    staged: Vec<(PathBuf, StoragePath)>,
}

impl ScriptedClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn operation_id(task_id: &str) -> String {
        format!("operations/{}", task_id)
    }

    /// Queues poll answers for the operation created for `task_id`
    pub(crate) fn script_polls(
        &self,
        task_id: &str,
        answers: impl IntoIterator<Item = Result<PollResponse, RemoteError>>,
    ) {
        let mut state = self.state.lock().unwrap();
        state
            .polls
            .entry(Self::operation_id(task_id))
            .or_default()
            .extend(answers);
    }

    pub(crate) fn fail_submit(&self, task_id: &str, error: RemoteError) {
        let mut state = self.state.lock().unwrap();
        state.submit_errors.insert(task_id.to_string(), error);
    }

    /// Makes the submission of `task_id` wait until the returned gate is notified
    pub(crate) fn gate_submit(&self, task_id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        let mut state = self.state.lock().unwrap();
        state.submit_gates.insert(task_id.to_string(), gate.clone());
        gate
    }

    /// Polls of the operation created for `task_id` never answer
    pub(crate) fn hang_polls(&self, task_id: &str) {
        let mut state = self.state.lock().unwrap();
        state.hung.insert(Self::operation_id(task_id));
    }

    pub(crate) fn fail_staging(&self) {
        self.state.lock().unwrap().fail_staging = true;
    }

    pub(crate) fn fail_cancel(&self, error: RemoteError) {
        self.state.lock().unwrap().cancel_error = Some(error);
    }

    pub(crate) fn submitted(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.submitted.iter().map(|(id, _)| id.clone()).collect()
    }

    pub(crate) fn poll_count(&self, task_id: &str) -> usize {
        self.poll_times(task_id).len()
    }

    pub(crate) fn poll_times(&self, task_id: &str) -> Vec<Instant> {
        let op = Self::operation_id(task_id);
        let state = self.state.lock().unwrap();
        state
            .poll_log
            .iter()
            .filter(|(id, _)| *id == op)
            .map(|(_, at)| *at)
            .collect()
    }

    pub(crate) fn submit_time(&self, task_id: &str) -> Option<Instant> {
        let state = self.state.lock().unwrap();
        state
            .submitted
            .iter()
            .find(|(id, _)| id == task_id)
            .map(|(_, at)| *at)
    }

    pub(crate) fn cancelled(&self) -> HashSet<String> {
        self.state.lock().unwrap().cancelled.iter().cloned().collect()
    }

    pub(crate) fn staged(&self) -> Vec<(PathBuf, StoragePath)> {
        self.state.lock().unwrap().staged.clone()
    }
}

#[async_trait]
impl RemoteJobClient for ScriptedClient {
    async fn submit(&self, job: &JobDescription) -> Result<String, RemoteError> {
        let gate = {
            let state = self.state.lock().unwrap();
            state.submit_gates.get(job.task_id.as_str()).cloned()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.submit_errors.get(job.task_id.as_str()) {
            return Err(error.clone());
        }
        state
            .submitted
            .push((job.task_id.to_string(), Instant::now()));
        Ok(Self::operation_id(job.task_id.as_str()))
    }

    async fn poll(&self, operation_id: &str) -> Result<PollResponse, RemoteError> {
        let hung = {
            let mut state = self.state.lock().unwrap();
            state
                .poll_log
                .push((operation_id.to_string(), Instant::now()));
            state.hung.contains(operation_id)
        };
        if hung {
            std::future::pending::<()>().await;
        }

        let mut state = self.state.lock().unwrap();
        state
            .polls
            .get_mut(operation_id)
            .and_then(|answers| answers.pop_front())
            .unwrap_or_else(|| Ok(PollResponse::running()))
    }

    async fn cancel(&self, operation_id: &str) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.cancelled.push(operation_id.to_string());
        match &state.cancel_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn stage_file(
        &self,
        local_path: &Path,
        remote_dir: &StoragePath,
    ) -> Result<StoragePath, RemoteError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_staging {
            return Err(RemoteError::Transient("upload interrupted".to_string()));
        }
        let name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let dest = remote_dir.join(&name);
        state.staged.push((local_path.to_path_buf(), dest.clone()));
        Ok(dest)
    }
}
