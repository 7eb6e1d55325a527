/// Timestamped backup and restore of a mesh installation
///
/// A backup is a directory `mesh_backup_<YYYYmmdd_HHMMSS>` under the backup
/// root holding copies of `config/` (always) and `logs/` (when present), plus a
/// `backup_info.json` manifest with a SHA-256 per copied file. Restore checks
/// the manifest before it touches the live tree.
use crate::error::{MeshError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub const BACKUP_INFO_FILE: &str = "backup_info.json";
pub const BACKUP_PREFIX: &str = "mesh_backup_";
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

const CONFIG_DIR: &str = "config";
const LOGS_DIR: &str = "logs";

/// One file captured in a backup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackupFile {
    /// Relative to the backup directory, `/`-separated
    pub path: String,
    pub size: u64,
    pub sha256: String,
}

/// Manifest written as `backup_info.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackupInfo {
    pub timestamp: String,
    pub source: String,
    pub contents: Vec<String>,
    #[serde(default)]
    pub files: Vec<BackupFile>,
}

impl BackupInfo {
    pub fn name(&self) -> String {
        format!("{}{}", BACKUP_PREFIX, self.timestamp)
    }
}

/// Backup manager for one mesh directory
pub struct MeshBackup {
    mesh_dir: PathBuf,
    backup_dir: PathBuf,
}

impl MeshBackup {
    /// Create a manager; the backup directory is created if missing.
    pub fn new(mesh_dir: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Result<Self> {
        let mesh_dir = mesh_dir.into();
        let backup_dir = backup_dir.into();
        fs::create_dir_all(&backup_dir).map_err(|e| MeshError::io_at(&backup_dir, e))?;
        Ok(Self {
            mesh_dir,
            backup_dir,
        })
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Back up using the current local time as the timestamp
    pub fn create_backup(&self) -> Result<BackupInfo> {
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        self.create_backup_at(&timestamp)
    }

    /// Back up under an explicit timestamp
    pub fn create_backup_at(&self, timestamp: &str) -> Result<BackupInfo> {
        let config_src = self.mesh_dir.join(CONFIG_DIR);
        if !config_src.is_dir() {
            return Err(MeshError::Backup(format!(
                "config directory not found: {}",
                config_src.display()
            )));
        }

        let backup_path = self.backup_dir.join(format!("{}{}", BACKUP_PREFIX, timestamp));
        if backup_path.exists() {
            return Err(MeshError::Backup(format!(
                "backup already exists: {}",
                backup_path.display()
            )));
        }

        let mut contents = vec![CONFIG_DIR.to_string()];
        copy_tree(&config_src, &backup_path.join(CONFIG_DIR))?;

        let logs_src = self.mesh_dir.join(LOGS_DIR);
        if logs_src.is_dir() {
            copy_tree(&logs_src, &backup_path.join(LOGS_DIR))?;
            contents.push(LOGS_DIR.to_string());
        }

        let mut files = Vec::new();
        for dir in &contents {
            files.extend(manifest_entries(&backup_path, &backup_path.join(dir))?);
        }

        let backup_info = BackupInfo {
            timestamp: timestamp.to_string(),
            source: self.mesh_dir.display().to_string(),
            contents,
            files,
        };

        let json = serde_json::to_string_pretty(&backup_info)?;
        let info_path = backup_path.join(BACKUP_INFO_FILE);
        fs::write(&info_path, json).map_err(|e| MeshError::io_at(&info_path, e))?;

        info!("Backup created at: {}", backup_path.display());
        Ok(backup_info)
    }

    /// Restore `config/` (and `logs/` when the backup has it) from a named backup
    pub fn restore_backup(&self, backup_name: &str) -> Result<()> {
        if backup_name.is_empty()
            || backup_name.contains('/')
            || backup_name.contains('\\')
            || backup_name == ".."
        {
            return Err(MeshError::Restore(format!(
                "invalid backup name: {:?}",
                backup_name
            )));
        }

        let backup_path = self.backup_dir.join(backup_name);
        if !backup_path.is_dir() {
            return Err(MeshError::Restore(format!(
                "Backup not found: {}",
                backup_name
            )));
        }

        let config_src = backup_path.join(CONFIG_DIR);
        if !config_src.is_dir() {
            return Err(MeshError::Restore(format!(
                "backup {} has no config directory",
                backup_name
            )));
        }

        match read_backup_info(&backup_path)? {
            Some(backup_info) => verify_files(&backup_path, &backup_info.files)?,
            None => warn!(
                "Backup {} has no {}; skipping integrity check",
                backup_name, BACKUP_INFO_FILE
            ),
        }

        replace_tree(&config_src, &self.mesh_dir.join(CONFIG_DIR))?;

        let logs_src = backup_path.join(LOGS_DIR);
        if logs_src.is_dir() {
            replace_tree(&logs_src, &self.mesh_dir.join(LOGS_DIR))?;
        }

        info!("Restored from backup: {}", backup_name);
        Ok(())
    }

    /// Names of complete backups, oldest first
    pub fn list_backups(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let entries =
            fs::read_dir(&self.backup_dir).map_err(|e| MeshError::io_at(&self.backup_dir, e))?;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if !path.join(BACKUP_INFO_FILE).is_file() {
                continue;
            }
            match path.file_name().and_then(|n| n.to_str()) {
                Some(name) if name.starts_with(BACKUP_PREFIX) => names.push(name.to_string()),
                _ => {}
            }
        }
        names.sort();
        Ok(names)
    }
}

fn read_backup_info(backup_path: &Path) -> Result<Option<BackupInfo>> {
    let info_path = backup_path.join(BACKUP_INFO_FILE);
    if !info_path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(&info_path).map_err(|e| MeshError::io_at(&info_path, e))?;
    Ok(Some(serde_json::from_str(&raw)?))
}

fn verify_files(backup_path: &Path, files: &[BackupFile]) -> Result<()> {
    for file in files {
        let path = backup_path.join(&file.path);
        let meta = fs::metadata(&path)
            .map_err(|_| MeshError::Integrity(format!("missing file {}", file.path)))?;
        if meta.len() != file.size {
            return Err(MeshError::Integrity(format!(
                "size mismatch for {}: expected {}, found {}",
                file.path,
                file.size,
                meta.len()
            )));
        }
        let digest = sha256_file(&path)?;
        if digest != file.sha256 {
            return Err(MeshError::Integrity(format!(
                "checksum mismatch for {}",
                file.path
            )));
        }
    }
    debug!("Verified {} backup files", files.len());
    Ok(())
}

/// Remove `dst` (if present) and copy `src` in its place
fn replace_tree(src: &Path, dst: &Path) -> Result<()> {
    match fs::remove_dir_all(dst) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(MeshError::io_at(dst, e)),
    }
    copy_tree(src, dst)
}

/// Recursively copy a directory, following symlinks
pub fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry.map_err(io::Error::from)?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| MeshError::Backup(format!("unexpected path in walk: {}", e)))?;
        let target = dst.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| MeshError::io_at(&target, e))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| MeshError::io_at(parent, e))?;
            }
            fs::copy(entry.path(), &target).map_err(|e| MeshError::io_at(entry.path(), e))?;
        }
    }
    Ok(())
}

fn manifest_entries(root: &Path, dir: &Path) -> Result<Vec<BackupFile>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| MeshError::Backup(format!("unexpected path in walk: {}", e)))?;
        let path = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let size = entry.metadata().map_err(io::Error::from)?.len();

        files.push(BackupFile {
            path,
            size,
            sha256: sha256_file(entry.path())?,
        });
    }
    Ok(files)
}

fn sha256_file(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path).map_err(|e| MeshError::io_at(path, e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| MeshError::io_at(path, e))?;
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn mesh_fixture(root: &Path, with_logs: bool) {
        fs::create_dir_all(root.join("config/nested")).unwrap();
        fs::write(root.join("config/system_info.json"), r#"{"hostname":"a"}"#).unwrap();
        fs::write(root.join("config/nested/keys.bin"), [0u8, 1, 2, 255]).unwrap();
        if with_logs {
            fs::create_dir_all(root.join("logs")).unwrap();
            fs::write(root.join("logs/mesh.log"), "started\n").unwrap();
        }
    }

    #[test]
    fn test_manifest_lists_copied_files() {
        let tmp = TempDir::new().unwrap();
        let mesh = tmp.path().join("mesh");
        mesh_fixture(&mesh, false);

        let backup = MeshBackup::new(&mesh, tmp.path().join("backups")).unwrap();
        let info = backup.create_backup_at("20240101_120000").unwrap();

        assert_eq!(info.contents, vec!["config".to_string()]);
        let paths: Vec<&str> = info.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["config/nested/keys.bin", "config/system_info.json"]
        );
        assert_eq!(info.files[0].size, 4);
        assert_eq!(info.files[0].sha256.len(), 64);
    }

    #[test]
    fn test_backup_requires_config_dir() {
        let tmp = TempDir::new().unwrap();
        let backup = MeshBackup::new(tmp.path().join("mesh"), tmp.path().join("backups")).unwrap();
        assert!(matches!(
            backup.create_backup_at("20240101_120000"),
            Err(MeshError::Backup(_))
        ));
    }

    #[test]
    fn test_backup_never_overwrites() {
        let tmp = TempDir::new().unwrap();
        let mesh = tmp.path().join("mesh");
        mesh_fixture(&mesh, true);

        let backup = MeshBackup::new(&mesh, tmp.path().join("backups")).unwrap();
        backup.create_backup_at("20240101_120000").unwrap();
        assert!(matches!(
            backup.create_backup_at("20240101_120000"),
            Err(MeshError::Backup(_))
        ));
    }

    #[test]
    fn test_restore_unknown_backup() {
        let tmp = TempDir::new().unwrap();
        let backup = MeshBackup::new(tmp.path().join("mesh"), tmp.path().join("backups")).unwrap();
        let err = backup.restore_backup("mesh_backup_19990101_000000").unwrap_err();
        assert!(err.to_string().contains("Backup not found"));
    }

    #[test]
    fn test_restore_rejects_path_names() {
        let tmp = TempDir::new().unwrap();
        let backup = MeshBackup::new(tmp.path().join("mesh"), tmp.path().join("backups")).unwrap();
        assert!(backup.restore_backup("../mesh").is_err());
        assert!(backup.restore_backup("").is_err());
    }

    #[test]
    fn test_list_backups_sorted_and_complete_only() {
        let tmp = TempDir::new().unwrap();
        let mesh = tmp.path().join("mesh");
        mesh_fixture(&mesh, false);

        let backup = MeshBackup::new(&mesh, tmp.path().join("backups")).unwrap();
        backup.create_backup_at("20240102_000000").unwrap();
        backup.create_backup_at("20240101_000000").unwrap();
        fs::create_dir_all(backup.backup_dir().join("mesh_backup_partial")).unwrap();
        let stray = backup.backup_dir().join("random");
        fs::create_dir_all(&stray).unwrap();
        fs::write(stray.join(BACKUP_INFO_FILE), "{}").unwrap();

        assert_eq!(
            backup.list_backups().unwrap(),
            vec![
                "mesh_backup_20240101_000000".to_string(),
                "mesh_backup_20240102_000000".to_string()
            ]
        );
    }
}
