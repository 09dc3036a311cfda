//! Run-wide settings
//!
//! A read-only tree of JSON values navigated with dotted keys such as
//! `gcp.project`. Both nested objects (`{"gcp": {"project": "p1"}}`) and flat
//! dotted keys (`{"gcp.project": "p1"}`) are understood, in any mix.

use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Setting keys read by the executor
pub mod keys {
    pub const PROJECT: &str = "gcp.project";
    pub const ZONE: &str = "gcp.zone";
    pub const REGION: &str = "gcp.region";
    pub const LOCATION: &str = "gcp.location";
    pub const WORK_DIR: &str = "gcp.workDir";
    pub const BOOT_DISK_SIZE: &str = "gcp.bootDiskSize";
    pub const CPU_PLATFORM: &str = "gcp.cpuPlatform";
    pub const NETWORK: &str = "gcp.network";
    pub const SUBNETWORK: &str = "gcp.subnetwork";
    pub const USE_PRIVATE_ADDRESS: &str = "gcp.usePrivateAddress";
    pub const SERVICE_ACCOUNT_EMAIL: &str = "gcp.serviceAccountEmail";
    pub const SSH_DAEMON: &str = "gcp.sshDaemon";
    pub const KEEP_ALIVE_ON_FAILURE: &str = "gcp.keepAliveOnFailure";
    pub const PREEMPTIBLE: &str = "cloud.preemptible";
    pub const ENV_PATH: &str = "env.PATH";
    pub const DISABLE_REMOTE_BIN_DIR: &str = "executor.disableRemoteBinDir";
}

/// Read-only run settings
#[derive(Debug, Clone, Default)]
pub struct RunSettings {
    root: Map<String, Value>,
}

impl RunSettings {
    /// Wraps a JSON object; any other value yields empty settings
    pub fn new(root: Value) -> Self {
        match root {
            Value::Object(root) => Self { root },
            _ => Self::default(),
        }
    }

    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Builds settings from flat `(key, value)` pairs
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let root = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self { root }
    }

    /// Looks up a setting; JSON `null` counts as absent
    pub fn get(&self, key: &str) -> Option<&Value> {
        lookup(&self.root, key).filter(|v| !v.is_null())
    }

    /// Returns true if the key holds a non-empty value
    pub fn has_value(&self, key: &str) -> bool {
        match self.get(key) {
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(_) => true,
            None => false,
        }
    }

    /// Scalar setting rendered as a trimmed, non-empty string
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Boolean setting; accepts JSON booleans and `"true"` / `"false"` strings
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                "" => Ok(None),
                other => Err(invalid(key, format!("expected a boolean, found `{}`", other))),
            },
            Some(other) => Err(invalid(key, format!("expected a boolean, found {}", other))),
        }
    }

    /// Positive integer setting; accepts numbers and numeric strings
    pub fn get_u32(&self, key: &str) -> Result<Option<u32>, ConfigError> {
        let parsed = match self.get(key) {
            None => return Ok(None),
            Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
            Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
            Some(_) => None,
        };

        match parsed {
            Some(n) if n > 0 => Ok(Some(n)),
            _ => Err(invalid(key, "expected a positive integer".to_string())),
        }
    }

    /// List setting; accepts a JSON array or a comma-separated string
    ///
    /// Entries keep their order and duplicates are kept. Returns `None` when
    /// the setting is absent or yields no entries.
    pub fn get_list(&self, key: &str) -> Option<Vec<String>> {
        let items = match self.get(key)? {
            Value::String(s) => parse_list(s),
            Value::Array(values) => values
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .filter(|s| !s.is_empty())
                .collect(),
            _ => return None,
        };

        Some(items).filter(|items| !items.is_empty())
    }
}

/// Splits a comma-separated list, trimming entries and dropping empty ones
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn lookup<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    if let Some(value) = object.get(key) {
        return Some(value);
    }

    // Try every split point so that `a.b.c` matches `{"a": {"b.c": ..}}` too
    key.match_indices('.').find_map(|(idx, _)| {
        let (head, rest) = (&key[..idx], &key[idx + 1..]);
        match object.get(head) {
            Some(Value::Object(child)) => lookup(child, rest),
            _ => None,
        }
    })
}

fn invalid(key: &str, reason: String) -> ConfigError {
    ConfigError::InvalidSetting {
        key: key.to_string(),
        reason,
    }
}
