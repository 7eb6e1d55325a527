/// Network diagnostics: interfaces, reachability and throughput
use crate::config::DiagnosticsConfig;
use crate::error::{MeshError, Result};
use crate::process::CommandRunner;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::net::IpAddr;
use std::path::Path;
use tracing::{debug, info, warn};

/// State of one network interface
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum InterfaceStatus {
    Active { ip: String },
    Error { error: String },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Reachability {
    Reachable,
    Unreachable,
}

/// Everything one diagnostics run found; serialized as `diagnostics.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DiagnosticsReport {
    pub network: BTreeMap<String, InterfaceStatus>,
    pub connectivity: BTreeMap<String, Reachability>,
    pub performance: Map<String, Value>,
}

impl DiagnosticsReport {
    pub fn performance_error(&self) -> Option<&str> {
        self.performance.get("error").and_then(|v| v.as_str())
    }

    /// Download speed in Mbps; the speed test reports bits per second
    pub fn download_mbps(&self) -> Option<f64> {
        self.performance
            .get("download")
            .and_then(|v| v.as_f64())
            .map(|bps| bps / 1_000_000.0)
    }

    /// Human-readable summary lines
    pub fn summary(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Interfaces checked: {}", self.network.len()),
            format!("Connectivity tests: {}", self.connectivity.len()),
        ];
        if self.performance_error().is_none() {
            let speed = self
                .download_mbps()
                .map(|m| format!("{:.2}", m))
                .unwrap_or_else(|| "N/A".to_string());
            lines.push(format!("Network speed: {} Mbps", speed));
        }
        lines
    }

    /// Write pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| MeshError::io_at(parent, e))?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| MeshError::io_at(path, e))?;
        info!("Diagnostics saved to {}", path.display());
        Ok(())
    }
}

/// Host network interfaces and their addresses
pub trait InterfaceSource {
    fn interfaces(&self) -> Result<Vec<(String, Vec<IpAddr>)>>;
}

/// Interfaces as reported by the OS through `sysinfo`
#[derive(Debug, Clone, Copy, Default)]
pub struct SysinfoInterfaces;

impl InterfaceSource for SysinfoInterfaces {
    fn interfaces(&self) -> Result<Vec<(String, Vec<IpAddr>)>> {
        let networks = sysinfo::Networks::new_with_refreshed_list();
        let mut out: Vec<(String, Vec<IpAddr>)> = networks
            .list()
            .iter()
            .map(|(name, data)| {
                let addrs = data.ip_networks().iter().map(|n| n.addr).collect();
                (name.clone(), addrs)
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }
}

pub struct MeshDiagnostics<R, I> {
    config: DiagnosticsConfig,
    runner: R,
    interfaces: I,
    results: DiagnosticsReport,
}

impl<R: CommandRunner, I: InterfaceSource> MeshDiagnostics<R, I> {
    pub fn new(config: DiagnosticsConfig, runner: R, interfaces: I) -> Self {
        Self {
            config,
            runner,
            interfaces,
            results: DiagnosticsReport::default(),
        }
    }

    pub fn results(&self) -> &DiagnosticsReport {
        &self.results
    }

    /// Record each interface holding an IPv4 address
    pub fn check_interfaces(&mut self) {
        let interfaces = match self.interfaces.interfaces() {
            Ok(list) => list,
            Err(e) => {
                warn!("Interface enumeration failed: {}", e);
                self.results.network.insert(
                    "*".to_string(),
                    InterfaceStatus::Error {
                        error: e.to_string(),
                    },
                );
                return;
            }
        };

        for (name, addrs) in interfaces {
            if let Some(ip) = addrs.iter().find(|a| a.is_ipv4()) {
                self.results
                    .network
                    .insert(name, InterfaceStatus::Active { ip: ip.to_string() });
            } else {
                debug!("Skipping {} (no IPv4 address)", name);
            }
        }
    }

    /// Ping each configured host once
    pub fn check_connectivity(&mut self) {
        for host in &self.config.hosts {
            let mut argv = self.config.ping_command.clone();
            argv.push(host.clone());

            let state = match self.runner.run_argv(&argv) {
                Ok(out) if out.success() => Reachability::Reachable,
                Ok(_) => Reachability::Unreachable,
                Err(e) => {
                    warn!("Ping of {} could not run: {}", host, e);
                    Reachability::Unreachable
                }
            };
            self.results.connectivity.insert(host.clone(), state);
        }
    }

    /// Run the speed test and keep its JSON output
    pub fn check_performance(&mut self) {
        self.results.performance = match self.speed_test() {
            Ok(map) => map,
            Err(e) => {
                let mut map = Map::new();
                map.insert("error".to_string(), Value::String(e.to_string()));
                map
            }
        };
    }

    fn speed_test(&self) -> Result<Map<String, Value>> {
        let out = self.runner.run_argv(&self.config.speedtest_command)?;
        match serde_json::from_str::<Value>(&out.stdout)? {
            Value::Object(map) => Ok(map),
            _ => Err(MeshError::Command(
                "speed test did not return a JSON object".to_string(),
            )),
        }
    }

    /// Run every check in order, reporting each step to `progress`
    pub fn run_diagnostics(&mut self, mut progress: impl FnMut(&str)) -> &DiagnosticsReport {
        progress("Checking interfaces...");
        self.check_interfaces();

        progress("Testing connectivity...");
        self.check_connectivity();

        progress("Testing performance...");
        self.check_performance();

        &self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::CommandOutput;

    struct FakeInterfaces(Vec<(String, Vec<IpAddr>)>);

    impl InterfaceSource for FakeInterfaces {
        fn interfaces(&self) -> Result<Vec<(String, Vec<IpAddr>)>> {
            Ok(self.0.clone())
        }
    }

    /// Hosts in `up` answer pings; the speed test prints `speed_output`
    struct FakeRunner {
        up: Vec<&'static str>,
        speed_output: &'static str,
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
            match program {
                "ping" => {
                    let host = args.last().map(String::as_str).unwrap_or("");
                    let status = if self.up.iter().any(|h| *h == host) { 0 } else { 1 };
                    Ok(CommandOutput {
                        status: Some(status),
                        ..Default::default()
                    })
                }
                "speedtest-cli" => Ok(CommandOutput {
                    status: Some(0),
                    stdout: self.speed_output.to_string(),
                    stderr: String::new(),
                }),
                other => Err(MeshError::Command(format!("failed to start {}", other))),
            }
        }
    }

    fn diagnostics(speed_output: &'static str) -> MeshDiagnostics<FakeRunner, FakeInterfaces> {
        MeshDiagnostics::new(
            DiagnosticsConfig::default(),
            FakeRunner {
                up: vec!["8.8.8.8"],
                speed_output,
            },
            FakeInterfaces(vec![
                ("en0".to_string(), vec!["192.168.1.20".parse().unwrap()]),
                ("lo6".to_string(), vec!["::1".parse().unwrap()]),
                (
                    "wlan0".to_string(),
                    vec!["fe80::1".parse().unwrap(), "10.0.0.7".parse().unwrap()],
                ),
            ]),
        )
    }

    #[test]
    fn test_interfaces_ipv4_only() {
        let mut diag = diagnostics("{}");
        diag.check_interfaces();

        let network = &diag.results().network;
        assert_eq!(network.len(), 2);
        assert_eq!(
            network.get("wlan0"),
            Some(&InterfaceStatus::Active {
                ip: "10.0.0.7".to_string()
            })
        );
        assert!(!network.contains_key("lo6"));
    }

    #[test]
    fn test_connectivity_by_exit_status() {
        let mut diag = diagnostics("{}");
        diag.check_connectivity();

        let c = &diag.results().connectivity;
        assert_eq!(c.get("8.8.8.8"), Some(&Reachability::Reachable));
        assert_eq!(c.get("1.1.1.1"), Some(&Reachability::Unreachable));
    }

    #[test]
    fn test_connectivity_spawn_failure_is_unreachable() {
        let mut config = DiagnosticsConfig::default();
        config.ping_command = vec!["no-such-ping".to_string()];
        let mut diag = MeshDiagnostics::new(
            config,
            FakeRunner {
                up: vec![],
                speed_output: "{}",
            },
            FakeInterfaces(vec![]),
        );
        diag.check_connectivity();
        assert!(diag
            .results()
            .connectivity
            .values()
            .all(|r| *r == Reachability::Unreachable));
    }

    #[test]
    fn test_performance_parse_error_recorded() {
        let mut diag = diagnostics("not json");
        diag.check_performance();
        assert!(diag.results().performance_error().is_some());
        assert_eq!(diag.results().summary().len(), 2);
    }

    #[test]
    fn test_summary_converts_download_to_mbps() {
        let mut diag = diagnostics(r#"{"download": 93520000.0, "upload": 1.0}"#);
        let progress_steps = {
            let mut steps = Vec::new();
            diag.run_diagnostics(|s| steps.push(s.to_string()));
            steps
        };
        assert_eq!(progress_steps.len(), 3);

        let summary = diag.results().summary();
        assert_eq!(summary[0], "Interfaces checked: 2");
        assert_eq!(summary[1], "Connectivity tests: 2");
        assert_eq!(summary[2], "Network speed: 93.52 Mbps");
    }

    #[test]
    fn test_report_json_shape() {
        let mut diag = diagnostics(r#"{"download": 1000000}"#);
        diag.run_diagnostics(|_| {});
        let value = serde_json::to_value(diag.results()).unwrap();

        assert_eq!(value["network"]["en0"]["status"], "active");
        assert_eq!(value["network"]["en0"]["ip"], "192.168.1.20");
        assert_eq!(value["connectivity"]["1.1.1.1"], "unreachable");
        assert_eq!(value["performance"]["download"], 1000000);
    }
}
