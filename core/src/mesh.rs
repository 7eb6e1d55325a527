/// Local node registry and heartbeat loop
use crate::config::{NETWORK_SCAN_FILE, SYSTEM_INFO_FILE};
use crate::error::{MeshError, Result};
use crate::events::EventEmitter;
use crate::system_info::{NetworkScan, SystemInfo};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

pub const DEFAULT_TRANSMISSION_POWER: f64 = 1.0;
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(5);
pub const MIN_HEARTBEAT: Duration = Duration::from_millis(1);

/// A host taking part in the mesh, keyed by hostname
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeshNode {
    pub id: String,
    pub transmission_power: f64,
}

impl MeshNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            transmission_power: DEFAULT_TRANSMISSION_POWER,
        }
    }
}

pub struct Mesh {
    local_id: String,
    nodes: BTreeMap<String, MeshNode>,
    heartbeat: Duration,
    events: EventEmitter,
}

impl Mesh {
    pub fn new(local: MeshNode, events: EventEmitter) -> Self {
        let local_id = local.id.clone();
        let mut nodes = BTreeMap::new();
        nodes.insert(local_id.clone(), local);
        Self {
            local_id,
            nodes,
            heartbeat: DEFAULT_HEARTBEAT,
            events,
        }
    }

    /// Heartbeat period, never below [`MIN_HEARTBEAT`]
    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat.max(MIN_HEARTBEAT);
        self
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    /// Register a node; an existing entry with the same id is kept.
    pub fn add_node(&mut self, node: MeshNode) -> bool {
        if self.nodes.contains_key(&node.id) {
            return false;
        }
        self.nodes.insert(node.id.clone(), node);
        true
    }

    pub fn heartbeat(&self) -> Duration {
        self.heartbeat
    }

    pub fn node(&self, id: &str) -> Option<&MeshNode> {
        self.nodes.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Heartbeat until `shutdown` resolves. Returns the number of heartbeats sent.
    pub async fn run<F>(&self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        info!("Starting mesh network...");
        self.events.emit("started", None).await;

        let mut ticker = interval(self.heartbeat);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;

        tokio::pin!(shutdown);
        let mut beats = 0u64;
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    beats += 1;
                    info!("Heartbeat {} from {} ({} nodes)", beats, self.local_id, self.node_count());
                    self.events.emit("heartbeat", None).await;
                }
            }
        }

        info!("Shutting down mesh network...");
        self.events.emit("stopped", None).await;
        beats
    }
}

/// Build the mesh from `system_info.json` and `network_scan.json` in `config_dir`
pub fn initialize_mesh(config_dir: &Path, events: impl FnOnce(&str) -> EventEmitter) -> Result<Mesh> {
    let system_info_path = config_dir.join(SYSTEM_INFO_FILE);
    let network_scan_path = config_dir.join(NETWORK_SCAN_FILE);

    if !(system_info_path.exists() && network_scan_path.exists()) {
        error!("Configuration files not found. Please run setup first");
        return Err(MeshError::Config(format!(
            "missing {} or {} in {}",
            SYSTEM_INFO_FILE,
            NETWORK_SCAN_FILE,
            config_dir.display()
        )));
    }

    let system_info = SystemInfo::load(&system_info_path)?;
    let network_scan = NetworkScan::load(&network_scan_path)?;

    if system_info.hostname.trim().is_empty() {
        return Err(MeshError::Config(format!(
            "{} has no hostname",
            system_info_path.display()
        )));
    }

    let hostname = system_info.hostname.clone();
    let mut mesh = Mesh::new(MeshNode::new(&hostname), events(&hostname));
    for peer in network_scan.peer_hostnames() {
        mesh.add_node(MeshNode::new(peer));
    }

    info!("Initialized mesh node: {}", hostname);
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &Path, system_info: &str, scan: &str) {
        fs::write(dir.join(SYSTEM_INFO_FILE), system_info).unwrap();
        fs::write(dir.join(NETWORK_SCAN_FILE), scan).unwrap();
    }

    fn silent(id: &str) -> EventEmitter {
        EventEmitter::disabled(id.to_string())
    }

    #[test]
    fn test_initialize_registers_local_and_peers() {
        let tmp = TempDir::new().unwrap();
        write_config(
            tmp.path(),
            r#"{"hostname":"node-a"}"#,
            r#"{"hosts":["node-b","node-a"]}"#,
        );

        let mesh = initialize_mesh(tmp.path(), silent).unwrap();
        assert_eq!(mesh.local_id(), "node-a");
        assert_eq!(mesh.node_count(), 2);
        assert_eq!(
            mesh.node("node-a").map(|n| n.transmission_power),
            Some(DEFAULT_TRANSMISSION_POWER)
        );
    }

    #[test]
    fn test_initialize_requires_both_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(SYSTEM_INFO_FILE), r#"{"hostname":"node-a"}"#).unwrap();
        assert!(matches!(
            initialize_mesh(tmp.path(), silent),
            Err(MeshError::Config(_))
        ));
    }

    #[test]
    fn test_initialize_requires_hostname() {
        let tmp = TempDir::new().unwrap();
        write_config(tmp.path(), r#"{"interfaces":{}}"#, "{}");
        assert!(initialize_mesh(tmp.path(), silent).is_err());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let mesh = Mesh::new(MeshNode::new("node-a"), silent("node-a"))
            .with_heartbeat(Duration::from_millis(10));

        let beats = mesh
            .run(tokio::time::sleep(Duration::from_millis(200)))
            .await;
        assert!(beats >= 1, "expected heartbeats, got {}", beats);
    }

    #[tokio::test]
    async fn test_zero_heartbeat_is_clamped() {
        let mesh = Mesh::new(MeshNode::new("node-a"), silent("node-a"))
            .with_heartbeat(Duration::ZERO);
        assert_eq!(mesh.heartbeat(), MIN_HEARTBEAT);

        let beats = mesh
            .run(tokio::time::sleep(Duration::from_millis(20)))
            .await;
        assert!(beats >= 1);
    }
}
