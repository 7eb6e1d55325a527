/// mesh-node - register this host in the mesh and keep it alive
use clap::Parser;
use meshkit_core::events::{EventEmitter, DEFAULT_EVENT_ADDR};
use meshkit_core::mesh::initialize_mesh;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "mesh-node", version, about = "Run the local mesh node")]
struct Args {
    /// Directory holding system_info.json and network_scan.json
    #[arg(long, default_value = "config")]
    config: PathBuf,

    /// Seconds between heartbeats
    #[arg(long, default_value_t = 5)]
    heartbeat_secs: u64,

    /// Where node events are sent for visualizers
    #[arg(long, default_value = DEFAULT_EVENT_ADDR)]
    event_addr: SocketAddr,

    /// Do not emit UDP events
    #[arg(long)]
    no_events: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    meshkit_core::logging::init("info");
    let args = Args::parse();

    if args.heartbeat_secs == 0 {
        error!("--heartbeat-secs must be at least 1");
        return Ok(ExitCode::FAILURE);
    }

    let mesh = match initialize_mesh(&args.config, |id| {
        if args.no_events {
            EventEmitter::disabled(id.to_string())
        } else {
            EventEmitter::new(id.to_string(), args.event_addr)
        }
    }) {
        Ok(mesh) => mesh.with_heartbeat(Duration::from_secs(args.heartbeat_secs)),
        Err(e) => {
            error!("Initialization error: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    info!("Node ID: {}", mesh.local_id());
    info!("Known nodes: {}", mesh.node_count());

    mesh.run(wait_for_shutdown()).await;
    info!("Node stopped");
    Ok(ExitCode::SUCCESS)
}

/// Resolves on Ctrl+C or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Ctrl+C received"),
            Err(e) => {
                warn!("Ctrl+C handler unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("SIGTERM received");
            }
            Err(e) => {
                warn!("SIGTERM handler unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
