use std::{
    future::Future,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use anyhow::{Context, Result};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use tokio::{
    net::{TcpListener, TcpStream},
    select,
    sync::mpsc,
};
use tokio_tungstenite::{
    WebSocketStream, accept_async,
    tungstenite::{Message, Utf8Bytes},
};
use tracing::{debug, info, warn};

use crate::hub::{ConnectionObserver, PeerHandle, PeerId};

/// Accepts WebSocket connections and feeds their lifecycle events into a
/// [`ConnectionObserver`].
pub struct Relay<O> {
    listener: TcpListener,
    observer: Arc<O>,
    next_peer_id: AtomicU64,
}

impl<O> Relay<O>
where
    O: ConnectionObserver + 'static,
{
    pub fn new(listener: TcpListener, observer: Arc<O>) -> Self {
        Self {
            listener,
            observer,
            next_peer_id: AtomicU64::new(1),
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let Relay {
            listener,
            observer,
            next_peer_id,
        } = self;
        tokio::pin!(shutdown);

        loop {
            select! {
                _ = &mut shutdown => {
                    info!("relay shutting down");
                    break;
                }
                accept_result = listener.accept() => {
                    handle_accept_result(accept_result, &observer, &next_peer_id);
                }
            }
        }

        Ok(())
    }

    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await
    }
}

fn handle_accept_result<O>(
    result: std::io::Result<(TcpStream, SocketAddr)>,
    observer: &Arc<O>,
    next_peer_id: &AtomicU64,
) where
    O: ConnectionObserver + 'static,
{
    match result {
        Ok((stream, peer)) => {
            let peer_id = next_peer_id.fetch_add(1, Ordering::Relaxed);
            spawn_peer_session(stream, peer, peer_id, observer);
        }
        Err(err) => warn!(error = ?err, "failed to accept connection"),
    }
}

fn spawn_peer_session<O>(stream: TcpStream, peer: SocketAddr, peer_id: PeerId, observer: &Arc<O>)
where
    O: ConnectionObserver + 'static,
{
    let observer = Arc::clone(observer);
    tokio::spawn(async move {
        if let Err(err) = handle_connection(stream, peer, peer_id, observer).await {
            warn!(peer = %peer, error = ?err, "peer connection closed with error");
        }
    });
}

async fn handle_connection<O>(
    stream: TcpStream,
    peer: SocketAddr,
    peer_id: PeerId,
    observer: Arc<O>,
) -> Result<()>
where
    O: ConnectionObserver,
{
    let ws_stream = accept_async(stream)
        .await
        .context("websocket handshake failed")?;
    let (ws_sender, ws_receiver) = ws_stream.split();

    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let handle = PeerHandle::new(peer_id, outbound_tx);
    info!(peer = %peer, id = handle.id(), "peer connected");
    observer.on_connect(handle).await;

    let writer = tokio::spawn(forward_outbound(outbound_rx, ws_sender));
    let session = read_inbound(ws_receiver, observer.as_ref(), peer_id).await;

    // Abnormal closure is still a disconnect; the peer must leave the set
    // before the error propagates.
    observer.on_disconnect(peer_id).await;
    info!(peer = %peer, id = peer_id, "peer disconnected");
    writer.abort();

    session
}

async fn forward_outbound(
    mut outbound: mpsc::UnboundedReceiver<String>,
    mut ws_sender: SplitSink<WebSocketStream<TcpStream>, Message>,
) {
    while let Some(frame) = outbound.recv().await {
        if let Err(error) = ws_sender.send(Message::Text(Utf8Bytes::from(frame))).await {
            debug!(?error, "failed to deliver frame to peer");
            break;
        }
    }
}

async fn read_inbound<O>(
    mut ws_receiver: SplitStream<WebSocketStream<TcpStream>>,
    observer: &O,
    peer_id: PeerId,
) -> Result<()>
where
    O: ConnectionObserver,
{
    while let Some(message) = ws_receiver.next().await {
        match message? {
            Message::Text(text) => observer.on_message(peer_id, text.as_str()).await,
            Message::Binary(bytes) => {
                // Payloads are opaque bytes treated as text.
                let text = String::from_utf8_lossy(&bytes);
                observer.on_message(peer_id, &text).await;
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    Ok(())
}
