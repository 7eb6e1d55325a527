/// Error types for the mesh utilities
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeshError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Command error: {0}")]
    Command(String),

    #[error("Backup error: {0}")]
    Backup(String),

    #[error("Restore error: {0}")]
    Restore(String),

    #[error("Integrity error: {0}")]
    Integrity(String),
}

impl MeshError {
    /// Attach a path to an IO error so log lines say which file failed
    pub fn io_at(path: &std::path::Path, err: std::io::Error) -> Self {
        MeshError::Io(std::io::Error::new(
            err.kind(),
            format!("{}: {}", path.display(), err),
        ))
    }
}

pub type Result<T> = std::result::Result<T, MeshError>;
