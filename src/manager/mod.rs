//! Link manager owning the single connection slot

use std::sync::Arc;

use futures::Stream;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::LinkConfig;
use crate::connector::{ConnectOutcome, Connector};
use crate::dispatch::{Dispatcher, LinkEvents, SessionPublisher, SharedDispatcher};
use crate::reader::{FrameReader, ReadOutcome};
use crate::transport::Transport;
use crate::types::{LinkState, Peer, find_peer};
use crate::{LinkError, Result};

#[cfg(test)]
mod tests;

/// The one outstanding worker: a connect attempt that becomes a read loop.
struct Worker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Worker {
    /// Cancel and wait until the worker has released its connection.
    async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!("Link worker ended abnormally: {}", e);
        }
    }
}

/// Manages the stream link to one peer at a time.
///
/// Each connect spawns one worker that opens the peer and then runs the
/// frame reader on the same task. A new connect or an explicit disconnect
/// cancels that worker and waits for it to finish before the slot is
/// reused, so two readers never share a stream.
///
/// Events reach the subscriber through the [`LinkEvents`] returned from
/// [`LinkManager::new`]; the current [`LinkState`] is readable at any time.
pub struct LinkManager {
    transport: Arc<dyn Transport>,
    config: LinkConfig,
    dispatcher: SharedDispatcher,
    state: watch::Receiver<LinkState>,
    worker: Mutex<Option<Worker>>,
}

impl LinkManager {
    /// Create a manager and the event stream for its single subscriber.
    pub fn new(transport: Arc<dyn Transport>, config: LinkConfig) -> (Self, LinkEvents) {
        let (dispatcher, events, state) = Dispatcher::new();
        let manager = Self {
            transport,
            config,
            dispatcher: Arc::new(Mutex::new(dispatcher)),
            state,
            worker: Mutex::new(None),
        };
        (manager, events)
    }

    /// Current link state.
    pub fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    /// Link state changes as a stream, starting with the current state.
    pub fn state_updates(&self) -> impl Stream<Item = LinkState> + 'static {
        WatchStream::new(self.state.clone())
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Connect to the configured target peer.
    pub async fn connect(&self) -> Result<Peer> {
        let target = self.config.target_name.clone();
        self.connect_to(&target).await
    }

    /// Connect to the bonded peer named exactly `name`, on the configured
    /// service token.
    ///
    /// Returns once the attempt has been started; `Connected` arrives on
    /// the event stream when the handshake completes. With no matching
    /// peer nothing is opened and the state is left alone.
    pub async fn connect_to(&self, name: &str) -> Result<Peer> {
        if !self.transport.is_powered() {
            let error = LinkError::AdapterUnavailable;
            warn!("Cannot connect to {}: {}", name, error);
            return Err(error);
        }

        let peers = self.transport.bonded_peers().await?;
        let Some(peer) = find_peer(&peers, name) else {
            let error = LinkError::peer_not_found(name);
            warn!(bonded = peers.len(), "{}", error);
            return Err(error);
        };
        let peer = peer.with_token(self.config.service_token.clone());

        self.connect_peer(peer.clone()).await;
        Ok(peer)
    }

    /// Start a connect attempt to `peer`, superseding any earlier attempt
    /// or live session.
    pub async fn connect_peer(&self, peer: Peer) {
        let mut slot = self.worker.lock().await;
        if let Some(previous) = slot.take() {
            debug!(peer = %peer, "Superseding previous link worker");
            previous.stop().await;
        }

        let generation = self.dispatcher.lock().await.begin_connect();
        let publisher = SessionPublisher::new(Arc::clone(&self.dispatcher), generation);
        let connector = Connector::new(Arc::clone(&self.transport), self.config.connect_timeout());
        let cancel = CancellationToken::new();

        let worker_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            run_session(connector, peer, publisher, worker_cancel).await;
        });

        *slot = Some(Worker { cancel, handle });
    }

    /// Drop the current attempt or session.
    ///
    /// Returns false, and does nothing, when already disconnected. The
    /// connection is closed before this returns.
    pub async fn disconnect(&self) -> bool {
        let mut slot = self.worker.lock().await;
        let changed = self.dispatcher.lock().await.cancel();
        if let Some(worker) = slot.take() {
            worker.stop().await;
        }
        if changed {
            info!("Link disconnected on request");
        }
        changed
    }

    /// Connect when disconnected, disconnect otherwise.
    pub async fn toggle(&self) -> Result<LinkState> {
        if self.state().is_active() {
            self.disconnect().await;
        } else {
            self.connect().await?;
        }
        Ok(self.state())
    }

    /// Disconnect and wait for the worker to finish.
    pub async fn shutdown(&self) {
        self.disconnect().await;
    }
}

impl Drop for LinkManager {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.get_mut().take() {
            debug!("Dropping link manager");
            worker.cancel.cancel();
        }
    }
}

/// Worker body: connect, then read until the session ends.
async fn run_session(
    connector: Connector,
    peer: Peer,
    publisher: SessionPublisher,
    cancel: CancellationToken,
) {
    let connection = match connector.connect(&peer, &cancel).await {
        ConnectOutcome::Open(connection) => connection,
        ConnectOutcome::Cancelled => return,
        ConnectOutcome::Failed(_) => {
            publisher.connect_failed().await;
            return;
        }
    };

    if !publisher.connected().await {
        debug!(peer = %peer, "Attempt superseded after open, closing");
        return;
    }

    match FrameReader::new(connection).run(&cancel, &publisher).await {
        ReadOutcome::Failed(e) => {
            debug!(peer = %peer, kind = ?e.kind(), "Session ended with error")
        }
        outcome => debug!(peer = %peer, ?outcome, "Session ended"),
    }
}
