//! Preflight validation
//!
//! Turns run settings into a [`RunConfiguration`] or a fatal [`ConfigError`].
//! Checks run in a fixed order and stop at the first failure, so a
//! configuration is either fully built or not built at all. Staging the
//! auxiliary binaries is the only side effect and runs after every pure check.

use gls_core::domain::run::{Placement, RunConfiguration, VmOptions};
use gls_core::domain::storage::StoragePath;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ConfigError;
use crate::repository::RemoteJobClient;
use crate::settings::{RunSettings, keys};

/// API location used when neither `gcp.location` nor a region is given
pub const DEFAULT_LOCATION: &str = "us-central1";

/// Boot disk size used when `gcp.bootDiskSize` is not set
pub const DEFAULT_BOOT_DISK_GB: u32 = 10;

/// Inputs of the preflight check
#[derive(Debug, Clone, Copy)]
pub struct PreflightInput<'a> {
    pub settings: &'a RunSettings,
    /// Resolved working directory of the run
    pub work_dir: &'a str,
    /// Local directory of auxiliary binaries, if the project has one
    pub local_bin_dir: Option<&'a Path>,
}

/// Validates the run settings and stages auxiliary binaries
pub async fn validate(
    input: PreflightInput<'_>,
    remote: &dyn RemoteJobClient,
) -> Result<RunConfiguration, ConfigError> {
    let settings = input.settings;

    // All task I/O goes through remote storage
    let work_dir =
        StoragePath::parse(input.work_dir).ok_or_else(|| ConfigError::WorkDirNotRemote {
            work_dir: input.work_dir.to_string(),
        })?;

    let project_id = settings
        .get_str(keys::PROJECT)
        .ok_or_else(|| ConfigError::MissingSetting {
            key: keys::PROJECT.to_string(),
        })?;
    let placement = match (settings.get_list(keys::ZONE), settings.get_list(keys::REGION)) {
        (Some(_), Some(_)) => return Err(ConfigError::ZoneAndRegion),
        (None, None) => return Err(ConfigError::NoZoneOrRegion),
        (Some(zones), None) => Placement::Zones(zones),
        (None, Some(regions)) => Placement::Regions(regions),
    };

    if settings.has_value(keys::ENV_PATH) {
        warn!(
            "Environment `PATH` defined in config is ignored by the `google-lifesciences` executor"
        );
    }

    let preemptible = settings.get_bool(keys::PREEMPTIBLE)?.unwrap_or(false);
    let boot_disk_gb = settings
        .get_u32(keys::BOOT_DISK_SIZE)?
        .unwrap_or(DEFAULT_BOOT_DISK_GB);
    let vm = VmOptions {
        cpu_platform: settings.get_str(keys::CPU_PLATFORM),
        network: settings.get_str(keys::NETWORK),
        subnetwork: settings.get_str(keys::SUBNETWORK),
        use_private_address: settings.get_bool(keys::USE_PRIVATE_ADDRESS)?.unwrap_or(false),
        service_account_email: settings.get_str(keys::SERVICE_ACCOUNT_EMAIL),
        ssh_daemon: settings.get_bool(keys::SSH_DAEMON)?.unwrap_or(false),
        keep_alive_on_failure: settings
            .get_bool(keys::KEEP_ALIVE_ON_FAILURE)?
            .unwrap_or(false),
    };
    let bin_dir_disabled = settings
        .get_bool(keys::DISABLE_REMOTE_BIN_DIR)?
        .unwrap_or(false);

    let remote_bin_directory = match input.local_bin_dir {
        Some(dir) if !bin_dir_disabled => stage_bin_dir(dir, &work_dir, remote).await?,
        Some(dir) => {
            debug!("Remote bin dir disabled, not staging {}", dir.display());
            None
        }
        None => None,
    };

    let location = settings.get_str(keys::LOCATION).unwrap_or_else(|| match &placement {
        Placement::Regions(regions) => regions[0].clone(),
        Placement::Zones(_) => DEFAULT_LOCATION.to_string(),
    });

    let config = RunConfiguration {
        project_id,
        location,
        placement,
        work_dir,
        remote_bin_directory,
        preemptible,
        boot_disk_gb,
        vm,
    };

    info!(
        "Validated configuration: project={}, location={}, work_dir={}",
        config.project_id, config.location, config.work_dir
    );

    Ok(config)
}

/// Uploads every regular file of `dir` to a fresh scratch directory
///
/// Returns `None` when the directory does not exist or holds no files.
async fn stage_bin_dir(
    dir: &Path,
    work_dir: &StoragePath,
    remote: &dyn RemoteJobClient,
) -> Result<Option<StoragePath>, ConfigError> {
    match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => {}
        _ => {
            debug!("No local bin dir at {}", dir.display());
            return Ok(None);
        }
    }

    let files = list_files(dir).await.map_err(|e| staging_failed(dir, e))?;
    if files.is_empty() {
        debug!("Local bin dir {} is empty", dir.display());
        return Ok(None);
    }

    let scratch = work_dir
        .join("tmp")
        .join(&Uuid::new_v4().simple().to_string())
        .join("bin");

    for file in &files {
        remote
            .stage_file(file, &scratch)
            .await
            .map_err(|e| staging_failed(file, e))?;
    }

    info!(
        "Staged {} auxiliary file(s) from {} to {}",
        files.len(),
        dir.display(),
        scratch
    );

    Ok(Some(scratch))
}

/// Regular files directly inside `dir`, sorted by path
async fn list_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if tokio::fs::metadata(&path).await?.is_file() {
            files.push(path);
        } else {
            debug!("Skipping non-file entry {}", path.display());
        }
    }

    files.sort();
    Ok(files)
}

fn staging_failed(path: &Path, reason: impl ToString) -> ConfigError {
    ConfigError::StagingFailed {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}
