//! Opens the stream connection to a peer

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::transport::{Connection, Transport};
use crate::types::Peer;
use crate::{LinkError, Result};

/// Why a connect attempt produced no connection.
#[derive(Debug)]
pub enum ConnectOutcome {
    /// The channel is open.
    Open(Connection),
    /// Superseded or manually cancelled before the handshake finished.
    Cancelled,
    /// The transport refused, timed out, or failed.
    Failed(LinkError),
}

/// Runs one connect attempt against a transport.
pub struct Connector {
    transport: Arc<dyn Transport>,
    timeout: Option<Duration>,
}

impl Connector {
    pub fn new(transport: Arc<dyn Transport>, timeout: Option<Duration>) -> Self {
        Self { transport, timeout }
    }

    /// Open `peer`, giving up when `cancel` fires.
    ///
    /// Discovery is stopped first since it cannot run alongside connection
    /// setup. Whatever the transport had half-opened is dropped when the
    /// attempt is cancelled or times out.
    pub async fn connect(&self, peer: &Peer, cancel: &CancellationToken) -> ConnectOutcome {
        info!(peer = %peer, "Connecting");
        self.transport.cancel_discovery().await;

        let open = async {
            match self.timeout {
                Some(duration) => tokio::time::timeout(duration, self.transport.open(peer))
                    .await
                    .unwrap_or_else(|_| Err(LinkError::Timeout { duration })),
                None => self.transport.open(peer).await,
            }
        };

        let result: Result<Connection> = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(peer = %peer, "Connect attempt cancelled");
                return ConnectOutcome::Cancelled;
            }
            result = open => result,
        };

        match result {
            Ok(connection) => {
                info!(peer = %peer, "Connected");
                ConnectOutcome::Open(connection)
            }
            Err(e) => {
                warn!(peer = %peer, "Connect failed: {}", e);
                ConnectOutcome::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transports::memory::MemoryTransport;
    use crate::types::ServiceToken;

    #[tokio::test]
    async fn open_peer_yields_connection_and_stops_discovery() {
        let mut transport = MemoryTransport::new();
        let _remote = transport.add_peer("HC-06");
        let transport = Arc::new(transport);
        let connector = Connector::new(transport.clone(), None);

        let peer = Peer::new("HC-06", "memory://HC-06");
        let outcome = connector.connect(&peer, &CancellationToken::new()).await;

        assert!(matches!(outcome, ConnectOutcome::Open(ref c) if c.peer().name() == "HC-06"));
        assert_eq!(transport.discovery_cancellations(), 1);
    }

    #[tokio::test]
    async fn refused_peer_fails() {
        let mut transport = MemoryTransport::new();
        transport.add_refusing_peer("HC-06");
        let connector = Connector::new(Arc::new(transport), None);

        let peer = Peer::new("HC-06", "memory://HC-06");
        let outcome = connector.connect(&peer, &CancellationToken::new()).await;

        assert!(matches!(outcome, ConnectOutcome::Failed(LinkError::ConnectFailed { .. })));
    }

    #[tokio::test]
    async fn mismatched_service_token_fails_the_connect() {
        let mut transport = MemoryTransport::new();
        let _remote = transport.add_peer("HC-06");
        let connector = Connector::new(Arc::new(transport), None);

        let peer = Peer::new("HC-06", "memory://HC-06").with_token(ServiceToken::new("not-the-rig"));
        let outcome = connector.connect(&peer, &CancellationToken::new()).await;

        match outcome {
            ConnectOutcome::Failed(e) => assert_eq!(e.kind(), crate::ErrorKind::ConnectFailed),
            other => panic!("expected a failed connect, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn hanging_peer_times_out() {
        let mut transport = MemoryTransport::new();
        transport.add_unreachable_peer("HC-06");
        let connector = Connector::new(Arc::new(transport), Some(Duration::from_millis(20)));

        let peer = Peer::new("HC-06", "memory://HC-06");
        let outcome = connector.connect(&peer, &CancellationToken::new()).await;

        assert!(matches!(outcome, ConnectOutcome::Failed(LinkError::Timeout { .. })));
    }

    #[tokio::test]
    async fn cancellation_interrupts_a_blocked_handshake() {
        let mut transport = MemoryTransport::new();
        transport.add_unreachable_peer("HC-06");
        let connector = Connector::new(Arc::new(transport), None);
        let cancel = CancellationToken::new();

        let peer = Peer::new("HC-06", "memory://HC-06");
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let outcome = connector.connect(&peer, &cancel).await;
        assert!(matches!(outcome, ConnectOutcome::Cancelled));
    }
}
