//! Transport trait for reaching the rig

use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tracing::debug;

use crate::Result;
use crate::types::Peer;

/// Byte stream a transport hands back once a peer channel is open.
pub trait LinkStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> LinkStream for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// Trait for the radio stack (or anything standing in for it)
///
/// Transports own peer enumeration and channel setup. The link manager only
/// ever asks for the bonded set, stops discovery, and opens one peer at a
/// time.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Peers previously bonded with this device.
    async fn bonded_peers(&self) -> Result<Vec<Peer>>;

    /// Stop any in-progress discovery scan.
    ///
    /// Discovery and connection setup share the radio, so the connector
    /// calls this before every open.
    async fn cancel_discovery(&self) {}

    /// Whether the radio is switched on.
    fn is_powered(&self) -> bool {
        true
    }

    /// Open the service channel on `peer`.
    ///
    /// Blocks until the handshake completes or fails. Dropping the returned
    /// future must release anything partially opened.
    async fn open(&self, peer: &Peer) -> Result<Connection>;
}

/// An open duplex stream bound to one peer.
///
/// Exactly one component owns a `Connection` at a time. Dropping it closes
/// the underlying stream; there is no separate close call to forget or
/// repeat.
pub struct Connection {
    peer: Peer,
    stream: Box<dyn LinkStream>,
}

impl Connection {
    pub fn new(peer: Peer, stream: impl LinkStream + 'static) -> Self {
        Self { peer, stream: Box::new(stream) }
    }

    /// The peer this connection is bound to.
    pub fn peer(&self) -> &Peer {
        &self.peer
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").field("peer", &self.peer).finish_non_exhaustive()
    }
}

impl AsyncRead for Connection {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

// The link is receive-only today; writes pass straight through so the
// stream stays a true duplex for transports that need it.
impl AsyncWrite for Connection {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        debug!(peer = %self.peer, "Closing connection");
    }
}
