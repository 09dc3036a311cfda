//! Pipeline request construction

use gls_core::domain::job::JobDescription;
use gls_core::domain::run::Placement;
use gls_core::dto::pipeline::{
    Action, Disk, Mount, Network, Pipeline, Resources, RunPipelineRequest, ServiceAccount,
    VirtualMachine,
};
use std::collections::BTreeMap;

/// Name of the scratch disk holding the task work area
pub const WORK_DISK: &str = "gls-work";

/// Mount point of the work disk inside every container
pub const WORK_MOUNT: &str = "/work";

/// Container-side location of the staged auxiliary binaries
pub const BIN_MOUNT: &str = "/work/bin";

const TOOLS_IMAGE: &str = "google/cloud-sdk:slim";
const SSH_IMAGE: &str = "gcr.io/cloud-genomics-pipelines/tools";
const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Builds the `pipelines:run` body for a job
///
/// The pipeline is a fixed sequence of actions sharing the work disk:
/// an optional background ssh daemon, a stage-in step copying inputs and
/// auxiliary binaries, the task itself, a stage-out step that always runs,
/// and an optional keep-alive step that holds the VM after a failure.
pub fn run_request(job: &JobDescription) -> RunPipelineRequest {
    let mounts = vec![Mount {
        disk: WORK_DISK.to_string(),
        path: WORK_MOUNT.to_string(),
        read_only: false,
    }];

    let mut actions = Vec::new();

    if job.vm.ssh_daemon {
        actions.push(Action {
            container_name: "ssh".to_string(),
            image_uri: SSH_IMAGE.to_string(),
            entrypoint: Some("ssh-server".to_string()),
            port_mappings: BTreeMap::from([("22".to_string(), 22)]),
            run_in_background: true,
            ..Default::default()
        });
    }

    actions.push(Action {
        container_name: "stage-in".to_string(),
        image_uri: TOOLS_IMAGE.to_string(),
        commands: bash(&stage_in_script(job)),
        mounts: mounts.clone(),
        ..Default::default()
    });

    actions.push(Action {
        container_name: "task".to_string(),
        image_uri: job.image.clone(),
        commands: bash(&format!("cd {} && {}", WORK_MOUNT, job.script)),
        environment: job.environment.clone(),
        mounts: mounts.clone(),
        ..Default::default()
    });

    actions.push(Action {
        container_name: "stage-out".to_string(),
        image_uri: TOOLS_IMAGE.to_string(),
        commands: bash(&stage_out_script(job)),
        mounts,
        always_run: true,
        ..Default::default()
    });

    if job.vm.keep_alive_on_failure {
        actions.push(Action {
            container_name: "keep-alive".to_string(),
            image_uri: "alpine".to_string(),
            commands: vec![
                "sh".to_string(),
                "-c".to_string(),
                "if [ \"$GOOGLE_PIPELINE_FAILED\" = \"1\" ]; then sleep 3600; fi".to_string(),
            ],
            always_run: true,
            ..Default::default()
        });
    }

    let (zones, regions) = match &job.placement {
        Placement::Zones(zones) => (zones.clone(), Vec::new()),
        Placement::Regions(regions) => (Vec::new(), regions.clone()),
    };

    let network = if job.vm.network.is_some()
        || job.vm.subnetwork.is_some()
        || job.vm.use_private_address
    {
        Some(Network {
            network: job.vm.network.clone(),
            subnetwork: job.vm.subnetwork.clone(),
            use_private_address: job.vm.use_private_address,
        })
    } else {
        None
    };

    let virtual_machine = VirtualMachine {
        machine_type: job.machine_type.clone(),
        preemptible: job.preemptible,
        labels: job.labels.clone(),
        disks: vec![Disk {
            name: WORK_DISK.to_string(),
            size_gb: job.disk_gb,
        }],
        service_account: job.vm.service_account_email.clone().map(|email| ServiceAccount {
            email,
            scopes: vec![CLOUD_PLATFORM_SCOPE.to_string()],
        }),
        boot_disk_size_gb: job.boot_disk_gb,
        cpu_platform: job.vm.cpu_platform.clone(),
        network,
    };

    RunPipelineRequest {
        pipeline: Pipeline {
            actions,
            resources: Resources {
                regions,
                zones,
                virtual_machine,
            },
            environment: BTreeMap::new(),
            timeout: job.timeout_secs.map(|secs| format!("{}s", secs)),
        },
        labels: job.labels.clone(),
    }
}

fn bash(script: &str) -> Vec<String> {
    vec!["bash".to_string(), "-c".to_string(), script.to_string()]
}

fn stage_in_script(job: &JobDescription) -> String {
    let mut lines = vec![format!("mkdir -p {}", WORK_MOUNT)];

    for input in &job.inputs {
        lines.push(format!("gsutil -m -q cp -r {} {}/", shell_quote(input), WORK_MOUNT));
    }

    if let Some(bin_dir) = &job.remote_bin_dir {
        lines.push(format!("mkdir -p {}", BIN_MOUNT));
        lines.push(format!(
            "gsutil -m -q cp -r {} {}/",
            shell_quote(&format!("{}/*", bin_dir)),
            BIN_MOUNT
        ));
        lines.push(format!("chmod +x {}/*", BIN_MOUNT));
    }

    lines.join(" && ")
}

fn stage_out_script(job: &JobDescription) -> String {
    let mut lines = vec![format!("cd {}", WORK_MOUNT)];

    for output in &job.outputs {
        lines.push(format!(
            "(gsutil -m -q cp -r {} {}/ || true)",
            shell_quote(output),
            shell_quote(&job.work_dir.to_string())
        ));
    }

    lines.join(" && ")
}

/// Single-quotes a word for bash
fn shell_quote(word: &str) -> String {
    format!("'{}'", word.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gls_core::domain::run::VmOptions;
    use gls_core::domain::storage::StoragePath;
    use gls_core::domain::task::TaskId;

    fn job() -> JobDescription {
        JobDescription {
            task_id: TaskId::new("t1"),
            task_name: "align".to_string(),
            project_id: "p1".to_string(),
            location: "us-central1".to_string(),
            placement: Placement::Zones(vec!["z1".to_string(), "z2".to_string()]),
            machine_type: "custom-2-4096".to_string(),
            preemptible: true,
            boot_disk_gb: 10,
            disk_gb: 50,
            image: "ubuntu:22.04".to_string(),
            script: "bash .command.sh".to_string(),
            work_dir: StoragePath::parse("gs://bucket/work/t1").unwrap(),
            inputs: vec!["gs://bucket/data/reads.fq".to_string()],
            outputs: vec!["out.bam".to_string()],
            remote_bin_dir: None,
            environment: BTreeMap::from([("A".to_string(), "1".to_string())]),
            labels: BTreeMap::from([("task-id".to_string(), "t1".to_string())]),
            timeout_secs: Some(3600),
            vm: VmOptions::default(),
        }
    }

    #[test]
    fn test_basic_request_layout() {
        let req = run_request(&job());
        let names: Vec<_> = req
            .pipeline
            .actions
            .iter()
            .map(|a| a.container_name.as_str())
            .collect();

        assert_eq!(names, vec!["stage-in", "task", "stage-out"]);
        assert!(req.pipeline.actions[2].always_run);
        assert_eq!(req.pipeline.actions[1].image_uri, "ubuntu:22.04");
        assert_eq!(req.pipeline.resources.zones, vec!["z1", "z2"]);
        assert!(req.pipeline.resources.regions.is_empty());
        assert_eq!(req.pipeline.resources.virtual_machine.disks[0].size_gb, 50);
        assert!(req.pipeline.resources.virtual_machine.preemptible);
        assert_eq!(req.pipeline.timeout.as_deref(), Some("3600s"));
        assert!(req.pipeline.resources.virtual_machine.network.is_none());
    }

    #[test]
    fn test_stage_scripts_copy_inputs_and_outputs() {
        let req = run_request(&job());
        let stage_in = &req.pipeline.actions[0].commands[2];
        let stage_out = &req.pipeline.actions[2].commands[2];

        assert!(stage_in.contains("gsutil -m -q cp -r 'gs://bucket/data/reads.fq' /work/"));
        assert!(stage_out.contains("'out.bam' 'gs://bucket/work/t1'/"));
    }

    #[test]
    fn test_optional_actions_and_bin_dir() {
        let mut job = job();
        job.vm.ssh_daemon = true;
        job.vm.keep_alive_on_failure = true;
        job.vm.use_private_address = true;
        job.remote_bin_dir = Some(StoragePath::parse("gs://bucket/work/tmp/x/bin").unwrap());

        let req = run_request(&job);
        let names: Vec<_> = req
            .pipeline
            .actions
            .iter()
            .map(|a| a.container_name.as_str())
            .collect();

        assert_eq!(names, vec!["ssh", "stage-in", "task", "stage-out", "keep-alive"]);
        assert!(req.pipeline.actions[0].run_in_background);
        assert!(req.pipeline.actions[1].commands[2].contains("'gs://bucket/work/tmp/x/bin/*'"));
        assert!(
            req.pipeline.resources.virtual_machine.network.as_ref().unwrap().use_private_address
        );
    }

    #[test]
    fn test_shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }
}
