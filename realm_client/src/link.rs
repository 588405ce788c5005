//! Network link.
//!
//! Connects to an event server and republishes every framed event into an
//! [`EventHub`]. The hub is marked ready once the connection is up and
//! closed when the link ends, whatever the reason. A frame that does not
//! decode is dropped; only transport failures end the link.

use std::net::SocketAddr;

use realm_shared::{
    event::EventHub,
    net::{decode_from_bytes, ReliableConn},
};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Runs the link on a background task. The task yields the number of events
/// received.
pub fn spawn_link(addr: SocketAddr, hub: EventHub) -> JoinHandle<anyhow::Result<u64>> {
    tokio::spawn(async move {
        let result = run_link(addr, &hub).await;
        hub.close();
        result
    })
}

pub async fn run_link(addr: SocketAddr, hub: &EventHub) -> anyhow::Result<u64> {
    let mut conn = ReliableConn::connect(addr).await?;
    info!(server = %addr, "Connected to event server");
    hub.mark_ready();

    let mut received = 0u64;
    let mut dropped = 0u64;
    loop {
        let payload = match conn.recv_frame().await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                info!(received, dropped, "Event server closed the connection");
                return Ok(received);
            }
            Err(e) => {
                warn!(received, error = %e, "Event link failed");
                return Err(e);
            }
        };

        match decode_from_bytes(&payload) {
            Ok(event) => {
                received += 1;
                let delivered = hub.publish(event);
                debug!(received, delivered, "Event published");
            }
            Err(e) => {
                dropped += 1;
                warn!(len = payload.len(), error = %e, "Undecodable event dropped");
            }
        }
    }
}
