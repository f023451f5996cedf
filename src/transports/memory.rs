//! In-process loopback transport

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::io::{DuplexStream, duplex};
use tokio::sync::mpsc;
use tracing::debug;

use crate::transport::{Connection, Transport};
use crate::types::{Peer, ServiceToken};
use crate::{LinkError, Result};

const DUPLEX_CAPACITY: usize = 4096;

enum Behavior {
    Accept(mpsc::UnboundedSender<DuplexStream>),
    Refuse,
    Hang,
}

struct Endpoint {
    token: ServiceToken,
    behavior: Behavior,
}

/// Device side of an accepting in-memory peer.
///
/// Each successful open on the transport hands the far end of the new
/// stream to [`RemotePeer::accept`]. Write frames into it to play the rig;
/// drop it to close the link from the rig's side.
#[derive(Debug)]
pub struct RemotePeer {
    streams: mpsc::UnboundedReceiver<DuplexStream>,
}

impl RemotePeer {
    /// Wait for the next connection opened to this peer.
    pub async fn accept(&mut self) -> Option<DuplexStream> {
        self.streams.recv().await
    }
}

/// Transport whose peers live in the same process.
///
/// Peers are registered before the transport is shared. An accepting peer
/// connects immediately, a refusing peer fails the open, and an
/// unreachable peer never completes the handshake. Every peer answers only
/// on its own service token; an open with any other token is refused.
pub struct MemoryTransport {
    bonded: Vec<Peer>,
    endpoints: HashMap<String, Endpoint>,
    powered: AtomicBool,
    discovery_cancellations: AtomicUsize,
    opens: AtomicUsize,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            bonded: Vec::new(),
            endpoints: HashMap::new(),
            powered: AtomicBool::new(true),
            discovery_cancellations: AtomicUsize::new(0),
            opens: AtomicUsize::new(0),
        }
    }

    /// Bond a peer that accepts connections on the default service token.
    pub fn add_peer(&mut self, name: &str) -> RemotePeer {
        self.add_peer_with_token(name, ServiceToken::default())
    }

    /// Bond a peer that accepts connections on `token` only.
    pub fn add_peer_with_token(&mut self, name: &str, token: ServiceToken) -> RemotePeer {
        let (tx, rx) = mpsc::unbounded_channel();
        self.register(name, token, Behavior::Accept(tx));
        RemotePeer { streams: rx }
    }

    /// Bond a peer that rejects every connection.
    pub fn add_refusing_peer(&mut self, name: &str) {
        self.register(name, ServiceToken::default(), Behavior::Refuse);
    }

    /// Bond a peer whose handshake never completes.
    pub fn add_unreachable_peer(&mut self, name: &str) {
        self.register(name, ServiceToken::default(), Behavior::Hang);
    }

    /// Switch the simulated radio on or off.
    pub fn set_powered(&self, powered: bool) {
        self.powered.store(powered, Ordering::SeqCst);
    }

    /// How many times discovery was cancelled.
    pub fn discovery_cancellations(&self) -> usize {
        self.discovery_cancellations.load(Ordering::SeqCst)
    }

    /// How many opens were attempted.
    pub fn open_attempts(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn register(&mut self, name: &str, token: ServiceToken, behavior: Behavior) {
        self.bonded.retain(|peer| peer.name() != name);
        self.bonded.push(Peer::new(name, format!("memory://{}", name)));
        self.endpoints.insert(name.to_string(), Endpoint { token, behavior });
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transport for MemoryTransport {
    async fn bonded_peers(&self) -> Result<Vec<Peer>> {
        Ok(self.bonded.clone())
    }

    async fn cancel_discovery(&self) {
        self.discovery_cancellations.fetch_add(1, Ordering::SeqCst);
    }

    fn is_powered(&self) -> bool {
        self.powered.load(Ordering::SeqCst)
    }

    async fn open(&self, peer: &Peer) -> Result<Connection> {
        self.opens.fetch_add(1, Ordering::SeqCst);

        let Some(endpoint) = self.endpoints.get(peer.name()) else {
            return Err(LinkError::connect_failed(format!("{} is not reachable", peer)));
        };
        if endpoint.token != *peer.token() {
            return Err(LinkError::connect_failed(format!(
                "{} rejected service token {}",
                peer,
                peer.token()
            )));
        }

        match &endpoint.behavior {
            Behavior::Accept(remote) => {
                let (local, far) = duplex(DUPLEX_CAPACITY);
                remote
                    .send(far)
                    .map_err(|_| LinkError::connect_failed("remote peer is gone"))?;
                debug!(peer = %peer, "Opened in-memory stream");
                Ok(Connection::new(peer.clone(), local))
            }
            Behavior::Refuse => Err(LinkError::connect_failed("connection refused by peer")),
            Behavior::Hang => futures::future::pending().await,
        }
    }
}
