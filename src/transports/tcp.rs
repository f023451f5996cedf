//! Serial-over-radio bridge reached over TCP
//!
//! A bridge process (an RFCOMM-to-TCP forwarder, ser2net, or similar)
//! exposes the rig's serial channel on a socket. Bonded peers are the
//! configured bridge table; each peer's address is its socket address. The
//! bridge forwards a single channel, so the service token is not sent.

use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::config::LinkConfig;
use crate::transport::{Connection, Transport};
use crate::types::Peer;
use crate::{LinkError, Result};

/// Transport opening plain TCP streams to bridge addresses.
#[derive(Debug, Clone, Default)]
pub struct TcpTransport {
    peers: Vec<Peer>,
}

impl TcpTransport {
    /// Build from `(name, address)` pairs.
    pub fn new<I, N, A>(peers: I) -> Self
    where
        I: IntoIterator<Item = (N, A)>,
        N: Into<String>,
        A: Into<String>,
    {
        let peers = peers
            .into_iter()
            .map(|(name, address)| Peer::new(name, address))
            .collect();
        Self { peers }
    }

    /// Build from the configuration's bridge table.
    pub fn from_config(config: &LinkConfig) -> Self {
        Self::new(config.peers.iter().map(|p| (p.name.clone(), p.address.clone())))
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn bonded_peers(&self) -> Result<Vec<Peer>> {
        Ok(self.peers.clone())
    }

    async fn open(&self, peer: &Peer) -> Result<Connection> {
        let address = peer.address();
        debug!(peer = %peer, address, token = %peer.token(), "Opening bridge socket");

        let stream = TcpStream::connect(address).await.map_err(|e| {
            LinkError::connect_failed_with_source(format!("{} ({})", peer, address), Box::new(e))
        })?;

        // Records are tiny; don't let Nagle hold them back.
        if let Err(e) = stream.set_nodelay(true) {
            warn!(peer = %peer, "Could not disable Nagle: {}", e);
        }

        Ok(Connection::new(peer.clone(), stream))
    }
}
