/// Host and network snapshots written by the setup tooling
use crate::error::{MeshError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Contents of `system_info.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SystemInfo {
    #[serde(default)]
    pub hostname: String,

    /// Object keyed by interface name or a plain list; both are counted
    #[serde(default)]
    pub interfaces: Value,

    /// Anything else the setup script recorded
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SystemInfo {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| MeshError::io_at(path, e))?;
        let info = serde_json::from_str(&raw)?;
        Ok(info)
    }

    /// Best-effort load: unreadable, malformed or empty files read as absent.
    pub fn load_optional(path: &Path) -> Option<Self> {
        let parsed = fs::read_to_string(path)
            .map_err(|e| MeshError::io_at(path, e))
            .and_then(|raw| Ok(serde_json::from_str::<Value>(&raw)?));

        match parsed {
            Ok(Value::Object(map)) if map.is_empty() => None,
            Ok(value) => match serde_json::from_value(value) {
                Ok(info) => Some(info),
                Err(e) => {
                    debug!("Unexpected system info shape at {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                debug!("No usable system info at {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn active_nodes(&self) -> usize {
        match &self.interfaces {
            Value::Object(map) => map.len(),
            Value::Array(list) => list.len(),
            _ => 0,
        }
    }

    /// Hostname for display, `N/A` when unknown
    pub fn display_hostname(&self) -> &str {
        if self.hostname.trim().is_empty() {
            "N/A"
        } else {
            &self.hostname
        }
    }
}

/// Contents of `network_scan.json`; kept free-form
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct NetworkScan {
    pub entries: Map<String, Value>,
}

impl NetworkScan {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| MeshError::io_at(path, e))?;
        let value: Value = serde_json::from_str(&raw)?;
        match value {
            Value::Object(entries) => Ok(Self { entries }),
            other => Err(MeshError::Config(format!(
                "{} must contain a JSON object, found {}",
                path.display(),
                json_kind(&other)
            ))),
        }
    }

    /// Hostnames listed under `hosts`, either as strings or `{ "hostname": .. }` objects
    pub fn peer_hostnames(&self) -> Vec<String> {
        let Some(Value::Array(hosts)) = self.entries.get("hosts") else {
            return Vec::new();
        };

        hosts
            .iter()
            .filter_map(|h| match h {
                Value::String(s) => Some(s.clone()),
                Value::Object(o) => o
                    .get("hostname")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                _ => None,
            })
            .filter(|s| !s.trim().is_empty())
            .collect()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
