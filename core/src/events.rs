/// Best-effort UDP events for visualizers listening on the local host
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::debug;

pub const DEFAULT_EVENT_ADDR: &str = "127.0.0.1:9999";

#[derive(Clone)]
pub struct EventEmitter {
    node_id: String,
    target: Option<SocketAddr>,
}

impl EventEmitter {
    pub fn new(node_id: String, target: SocketAddr) -> Self {
        Self {
            node_id,
            target: Some(target),
        }
    }

    /// Emitter that drops every event
    pub fn disabled(node_id: String) -> Self {
        Self {
            node_id,
            target: None,
        }
    }

    pub fn payload(&self, event: &str, peer: Option<&str>) -> serde_json::Value {
        serde_json::json!({
            "node": self.node_id,
            "event": event,
            "peer": peer,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })
    }

    pub async fn emit(&self, event: &str, peer: Option<&str>) {
        let Some(target) = self.target else {
            return;
        };
        let payload = self.payload(event, peer).to_string();

        match UdpSocket::bind("127.0.0.1:0").await {
            Ok(sock) => {
                if let Err(e) = sock.send_to(payload.as_bytes(), target).await {
                    debug!("Dropped {} event: {}", event, e);
                }
            }
            Err(e) => debug!("Event socket unavailable: {}", e),
        }
    }
}
