/// Configuration management
use crate::error::{MeshError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_MESH_DIR: &str = "/Users/Shared/mesh-network";

/// Environment variable overriding the default mesh directory
pub const MESH_DIR_ENV: &str = "MESHKIT_MESH_DIR";

pub const SYSTEM_INFO_FILE: &str = "system_info.json";
pub const NETWORK_SCAN_FILE: &str = "network_scan.json";
pub const DIAGNOSTICS_FILE: &str = "diagnostics.json";
pub const NODE_CONFIG_FILE: &str = "default_config.yaml";

const DEFAULT_HOSTS: [&str; 2] = ["8.8.8.8", "1.1.1.1"];

/// Well-known locations under a mesh installation directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshPaths {
    root: PathBuf,
}

impl MeshPaths {
    pub fn new(mesh_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: mesh_dir.into(),
        }
    }

    /// Use `MESHKIT_MESH_DIR` when set, otherwise `default`
    pub fn from_env_or(default: impl Into<PathBuf>) -> Self {
        Self::from_override(std::env::var(MESH_DIR_ENV).ok(), default)
    }

    /// `dir` wins unless it is missing or blank
    pub fn from_override(dir: Option<String>, default: impl Into<PathBuf>) -> Self {
        match dir {
            Some(dir) if !dir.trim().is_empty() => Self::new(dir),
            _ => Self::new(default),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.join("config")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.root.join("backups")
    }

    pub fn system_info(&self) -> PathBuf {
        self.config_dir().join(SYSTEM_INFO_FILE)
    }

    pub fn network_scan(&self) -> PathBuf {
        self.config_dir().join(NETWORK_SCAN_FILE)
    }

    pub fn diagnostics_output(&self) -> PathBuf {
        self.logs_dir().join(DIAGNOSTICS_FILE)
    }

    /// Active node configuration
    pub fn node_config(&self) -> PathBuf {
        self.config_dir().join(NODE_CONFIG_FILE)
    }

    /// Staged replacement picked up by the updater
    pub fn staged_node_config(&self) -> PathBuf {
        self.config_dir().join(format!("{}.new", NODE_CONFIG_FILE))
    }

    /// Previous configuration kept by the updater
    pub fn node_config_backup(&self) -> PathBuf {
        self.config_dir().join(format!("{}.bak", NODE_CONFIG_FILE))
    }

    pub fn requirements(&self) -> PathBuf {
        self.root.join("requirements.txt")
    }

    pub fn venv_pip(&self) -> PathBuf {
        self.root.join("venv").join("bin").join("pip")
    }
}

impl Default for MeshPaths {
    fn default() -> Self {
        Self::from_env_or(DEFAULT_MESH_DIR)
    }
}

/// Settings for `mesh-diagnostics`, optionally loaded from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Hosts pinged for connectivity
    pub hosts: Vec<String>,

    /// Ping invocation; the host is appended as the last argument
    pub ping_command: Vec<String>,

    /// Speed test invocation; stdout must be a JSON object
    pub speedtest_command: Vec<String>,

    /// Where the report is written (defaults to `<mesh>/logs/diagnostics.json`)
    pub output: Option<PathBuf>,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            hosts: DEFAULT_HOSTS.iter().map(|h| h.to_string()).collect(),
            ping_command: vec!["ping".into(), "-c".into(), "1".into()],
            speedtest_command: vec!["speedtest-cli".into(), "--json".into()],
            output: None,
        }
    }
}

impl DiagnosticsConfig {
    /// Defaults with the report placed under the mesh logs directory
    pub fn default_for(paths: &MeshPaths) -> Self {
        Self {
            output: Some(paths.diagnostics_output()),
            ..Default::default()
        }
    }

    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MeshError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let raw = std::fs::read_to_string(path).map_err(|e| MeshError::io_at(path, e))?;
        let config: DiagnosticsConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.hosts.is_empty() {
            return Err(MeshError::Config("hosts must not be empty".to_string()));
        }
        if self.hosts.iter().any(|h| h.trim().is_empty()) {
            return Err(MeshError::Config("hosts must not contain blank entries".to_string()));
        }
        if self.ping_command.is_empty() {
            return Err(MeshError::Config("ping_command must not be empty".to_string()));
        }
        if self.speedtest_command.is_empty() {
            return Err(MeshError::Config(
                "speedtest_command must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolved report path
    pub fn output_path(&self, paths: &MeshPaths) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| paths.diagnostics_output())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_paths_layout() {
        let paths = MeshPaths::new("/srv/mesh");
        assert_eq!(paths.config_dir(), PathBuf::from("/srv/mesh/config"));
        assert_eq!(
            paths.system_info(),
            PathBuf::from("/srv/mesh/config/system_info.json")
        );
        assert_eq!(
            paths.node_config_backup(),
            PathBuf::from("/srv/mesh/config/default_config.yaml.bak")
        );
        assert_eq!(
            paths.staged_node_config(),
            PathBuf::from("/srv/mesh/config/default_config.yaml.new")
        );
        assert_eq!(paths.venv_pip(), PathBuf::from("/srv/mesh/venv/bin/pip"));
        assert_eq!(
            paths.diagnostics_output(),
            PathBuf::from("/srv/mesh/logs/diagnostics.json")
        );
    }

    #[test]
    fn test_diagnostics_config_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("diag.json");
        std::fs::write(&path, r#"{"hosts": ["10.0.0.1"]}"#).unwrap();

        let config = DiagnosticsConfig::load(&path).unwrap();
        assert_eq!(config.hosts, vec!["10.0.0.1".to_string()]);
        assert_eq!(config.ping_command, DiagnosticsConfig::default().ping_command);
        assert!(config.output.is_none());
    }

    #[test]
    fn test_diagnostics_config_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = DiagnosticsConfig::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, MeshError::Config(_)));
    }

    #[test]
    fn test_diagnostics_config_rejects_empty_hosts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("diag.json");
        std::fs::write(&path, r#"{"hosts": []}"#).unwrap();
        assert!(matches!(
            DiagnosticsConfig::load(&path),
            Err(MeshError::Config(_))
        ));
    }

    #[test]
    fn test_diagnostics_config_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("diag.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            DiagnosticsConfig::load(&path),
            Err(MeshError::Serialization(_))
        ));
    }

    #[test]
    fn test_override_dir() {
        let paths = MeshPaths::from_override(Some("/tmp/alt-mesh".to_string()), "/srv/mesh");
        assert_eq!(paths.root(), Path::new("/tmp/alt-mesh"));

        let paths = MeshPaths::from_override(Some("   ".to_string()), "/srv/mesh");
        assert_eq!(paths.root(), Path::new("/srv/mesh"));

        let paths = MeshPaths::from_override(None, "/srv/mesh");
        assert_eq!(paths.backups_dir(), PathBuf::from("/srv/mesh/backups"));
    }

    #[test]
    fn test_validate_rejects_blank_host_and_empty_commands() {
        let config = DiagnosticsConfig {
            hosts: vec!["8.8.8.8".to_string(), " ".to_string()],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(MeshError::Config(m)) if m.contains("blank")));

        let config = DiagnosticsConfig {
            ping_command: vec![],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(MeshError::Config(m)) if m.contains("ping_command")));

        let config = DiagnosticsConfig {
            speedtest_command: vec![],
            ..Default::default()
        };
        assert!(
            matches!(config.validate(), Err(MeshError::Config(m)) if m.contains("speedtest_command"))
        );
    }

    #[test]
    fn test_load_rejects_empty_ping_command() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("diagnostics.json");
        std::fs::write(&path, r#"{"ping_command": []}"#).unwrap();
        assert!(matches!(
            DiagnosticsConfig::load(&path),
            Err(MeshError::Config(_))
        ));
    }
}
