use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use crate::frame;

pub type PeerId = u64;

/// Outbound handle for one connected peer.
///
/// The sending half feeds the peer's writer task; the hub never touches the
/// underlying socket directly.
pub struct PeerHandle {
    id: PeerId,
    outbound: mpsc::UnboundedSender<String>,
}

impl PeerHandle {
    pub fn new(id: PeerId, outbound: mpsc::UnboundedSender<String>) -> Self {
        Self { id, outbound }
    }

    pub fn id(&self) -> PeerId {
        self.id
    }
}

/// Connection lifecycle events consumed by whatever tracks peers.
///
/// The relay drives these from each connection's socket task; [`Hub`] is the
/// production implementation.
#[async_trait]
pub trait ConnectionObserver: Send + Sync {
    async fn on_connect(&self, peer: PeerHandle);
    async fn on_message(&self, sender: PeerId, payload: &str);
    async fn on_disconnect(&self, peer: PeerId);
}

/// Tracks connected peers and relays every inbound payload to all of them,
/// the sender included.
#[derive(Default)]
pub struct Hub {
    peers: Mutex<HashMap<PeerId, mpsc::UnboundedSender<String>>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn peer_count(&self) -> usize {
        self.peers.lock().await.len()
    }
}

#[async_trait]
impl ConnectionObserver for Hub {
    async fn on_connect(&self, peer: PeerHandle) {
        let mut peers = self.peers.lock().await;
        peers.insert(peer.id, peer.outbound);
    }

    async fn on_message(&self, sender: PeerId, payload: &str) {
        let outgoing = frame::annotate(payload, &frame::local_timestamp());
        let peers = self.peers.lock().await;
        debug!(sender, recipients = peers.len(), "relaying frame");
        for (&id, outbound) in peers.iter() {
            // A peer whose transport already closed is skipped; its
            // disconnect event removes it from the set.
            if outbound.send(outgoing.clone()).is_err() {
                debug!(peer = id, "outbound channel closed, skipping delivery");
            }
        }
    }

    async fn on_disconnect(&self, peer: PeerId) {
        let mut peers = self.peers.lock().await;
        peers.remove(&peer);
    }
}
