/// meshkit - operator utilities for a mesh-network host
///
/// Monitoring, dependency/config updates, backup and restore, network
/// diagnostics, and a node runner that registers the local host in a mesh
/// registry and keeps a heartbeat alive.

pub mod error;
pub mod config;
pub mod logging;
pub mod process;
pub mod system_info;
pub mod backup;
pub mod updater;
pub mod diagnostics;
pub mod monitor;
pub mod events;
pub mod mesh;

pub use config::{DiagnosticsConfig, MeshPaths};
pub use error::{MeshError, Result};
pub use mesh::{Mesh, MeshNode};
