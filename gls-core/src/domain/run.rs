//! Run-wide configuration

use serde::{Deserialize, Serialize};

use crate::domain::storage::StoragePath;

/// Where the remote service may place task VMs
///
/// Exactly one of zones or regions is configured per run. The order of the
/// entries is preserved as given by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    Zones(Vec<String>),
    Regions(Vec<String>),
}

/// Optional virtual-machine settings forwarded to every job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmOptions {
    pub cpu_platform: Option<String>,
    pub network: Option<String>,
    pub subnetwork: Option<String>,
    pub use_private_address: bool,
    pub service_account_email: Option<String>,
    pub ssh_daemon: bool,
    pub keep_alive_on_failure: bool,
}

/// Validated configuration for one run
///
/// Built once after all preflight checks pass and shared read-only by every
/// task handle afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfiguration {
    pub project_id: String,
    /// API location the pipelines are submitted to
    pub location: String,
    pub placement: Placement,
    pub work_dir: StoragePath,
    /// Remote copy of the local auxiliary binaries, if any were staged
    pub remote_bin_directory: Option<StoragePath>,
    pub preemptible: bool,
    pub boot_disk_gb: u32,
    pub vm: VmOptions,
}

impl RunConfiguration {
    pub fn zones(&self) -> Option<&[String]> {
        match &self.placement {
            Placement::Zones(zones) => Some(zones),
            Placement::Regions(_) => None,
        }
    }

    pub fn regions(&self) -> Option<&[String]> {
        match &self.placement {
            Placement::Regions(regions) => Some(regions),
            Placement::Zones(_) => None,
        }
    }
}
