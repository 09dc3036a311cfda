//! Job description construction
//!
//! Pure translation of an engine task into a remote job description. No
//! remote I/O happens here.

use gls_core::domain::job::JobDescription;
use gls_core::domain::run::RunConfiguration;
use gls_core::domain::task::TaskDescription;
use std::collections::BTreeMap;

/// Machine type used when a task requests neither memory nor a machine type
pub const DEFAULT_MACHINE_TYPE: &str = "n1-standard-1";

/// Work disk size used when a task requests none
pub const DEFAULT_DISK_GB: u32 = 10;

/// Environment variable pointing the task at its remote work dir
pub const TASK_WORKDIR_ENV: &str = "NXF_TASK_WORKDIR";

const MEMORY_STEP_MB: u64 = 256;
const MAX_LABEL_LEN: usize = 63;

/// Builds the remote job for a task under the given run configuration
pub fn build_job(config: &RunConfiguration, task: &TaskDescription) -> JobDescription {
    let work_dir = config.work_dir.join(task.id.as_str());

    let mut environment = BTreeMap::new();
    environment.insert(TASK_WORKDIR_ENV.to_string(), work_dir.to_string());
    if config.remote_bin_directory.is_some() {
        environment.insert(
            "PATH".to_string(),
            format!(
                "{}:/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin",
                gls_client::BIN_MOUNT
            ),
        );
    }

    let mut labels = BTreeMap::new();
    labels.insert("task-id".to_string(), label_value(task.id.as_str()));
    if !task.name.is_empty() {
        labels.insert("task-name".to_string(), label_value(&task.name));
    }

    JobDescription {
        task_id: task.id.clone(),
        task_name: task.name.clone(),
        project_id: config.project_id.clone(),
        location: config.location.clone(),
        placement: config.placement.clone(),
        machine_type: machine_type(task),
        preemptible: config.preemptible,
        boot_disk_gb: config.boot_disk_gb,
        disk_gb: task.resources.disk_gb.unwrap_or(DEFAULT_DISK_GB),
        image: task.image.clone(),
        script: task.script.clone(),
        work_dir,
        inputs: task.inputs.clone(),
        outputs: task.outputs.clone(),
        remote_bin_dir: config.remote_bin_directory.clone(),
        environment,
        labels,
        timeout_secs: task.resources.timeout_secs,
        vm: config.vm.clone(),
    }
}

/// Custom machine type when memory is requested, otherwise the explicit or default type
fn machine_type(task: &TaskDescription) -> String {
    let resources = &task.resources;

    match resources.memory_mb {
        Some(memory_mb) => {
            let cpus = resources.cpus.unwrap_or(1).max(1);
            let memory_mb = memory_mb
                .max(MEMORY_STEP_MB)
                .div_ceil(MEMORY_STEP_MB)
                .checked_mul(MEMORY_STEP_MB)
                .unwrap_or(u64::MAX / MEMORY_STEP_MB * MEMORY_STEP_MB);
            format!("custom-{}-{}", cpus, memory_mb)
        }
        None => resources
            .machine_type
            .clone()
            .unwrap_or_else(|| DEFAULT_MACHINE_TYPE.to_string()),
    }
}

/// Lowercase, `[a-z0-9_-]` only, at most 63 characters
fn label_value(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .take(MAX_LABEL_LEN)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gls_core::domain::run::{Placement, VmOptions};
    use gls_core::domain::storage::StoragePath;
    use gls_core::domain::task::{ResourceRequest, TaskId};

    fn config() -> RunConfiguration {
        RunConfiguration {
            project_id: "p1".to_string(),
            location: "us-central1".to_string(),
            placement: Placement::Zones(vec!["z1".to_string()]),
            work_dir: StoragePath::parse("gs://bucket/work").unwrap(),
            remote_bin_directory: None,
            preemptible: true,
            boot_disk_gb: 20,
            vm: VmOptions::default(),
        }
    }

    fn task(resources: ResourceRequest) -> TaskDescription {
        TaskDescription {
            id: TaskId::new("ab/12cd"),
            name: "ALIGN (sample 1)".to_string(),
            image: "ubuntu".to_string(),
            script: "echo hi".to_string(),
            inputs: vec![],
            outputs: vec![],
            resources,
        }
    }

    #[test]
    fn test_job_inherits_run_configuration() {
        let job = build_job(&config(), &task(ResourceRequest::default()));

        assert_eq!(job.project_id, "p1");
        assert_eq!(job.placement, Placement::Zones(vec!["z1".to_string()]));
        assert!(job.preemptible);
        assert_eq!(job.boot_disk_gb, 20);
        assert_eq!(job.disk_gb, DEFAULT_DISK_GB);
        assert_eq!(job.machine_type, DEFAULT_MACHINE_TYPE);
        assert_eq!(job.work_dir.to_string(), "gs://bucket/work/ab/12cd");
        assert_eq!(
            job.environment.get(TASK_WORKDIR_ENV).map(String::as_str),
            Some("gs://bucket/work/ab/12cd")
        );
        assert!(!job.environment.contains_key("PATH"));
    }

    #[test]
    fn test_custom_machine_type_rounds_memory() {
        let job = build_job(
            &config(),
            &task(ResourceRequest {
                cpus: Some(4),
                memory_mb: Some(3000),
                ..Default::default()
            }),
        );
        assert_eq!(job.machine_type, "custom-4-3072");

        let job = build_job(
            &config(),
            &task(ResourceRequest {
                memory_mb: Some(100),
                machine_type: Some("n1-highmem-8".to_string()),
                ..Default::default()
            }),
        );
        assert_eq!(job.machine_type, "custom-1-256");
    }

    #[test]
    fn test_huge_memory_request_stays_on_step() {
        let job = build_job(
            &config(),
            &task(ResourceRequest {
                memory_mb: Some(u64::MAX),
                ..Default::default()
            }),
        );
        let largest = u64::MAX / MEMORY_STEP_MB * MEMORY_STEP_MB;
        assert_eq!(job.machine_type, format!("custom-1-{}", largest));
    }

    #[test]
    fn test_explicit_machine_type_and_disk() {
        let job = build_job(
            &config(),
            &task(ResourceRequest {
                machine_type: Some("n1-highmem-8".to_string()),
                disk_gb: Some(200),
                timeout_secs: Some(600),
                ..Default::default()
            }),
        );
        assert_eq!(job.machine_type, "n1-highmem-8");
        assert_eq!(job.disk_gb, 200);
        assert_eq!(job.timeout_secs, Some(600));
    }

    #[test]
    fn test_bin_dir_extends_path() {
        let mut config = config();
        config.remote_bin_directory = Some(StoragePath::parse("gs://bucket/work/tmp/x/bin").unwrap());

        let job = build_job(&config, &task(ResourceRequest::default()));
        assert!(job.environment["PATH"].starts_with("/work/bin:"));
        assert_eq!(job.remote_bin_dir, config.remote_bin_directory);
    }

    #[test]
    fn test_labels_are_sanitised() {
        let job = build_job(&config(), &task(ResourceRequest::default()));
        assert_eq!(job.labels["task-id"], "ab-12cd");
        assert_eq!(job.labels["task-name"], "align--sample-1-");

        assert_eq!(label_value(&"x".repeat(100)).len(), MAX_LABEL_LEN);
    }
}
