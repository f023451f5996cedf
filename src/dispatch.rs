//! Link state machine and ordered event delivery.
//!
//! The [`Dispatcher`] is the only place [`LinkState`] changes and the only
//! producer on the subscriber channel. State and channel change together
//! under one lock, so the subscriber sees events in exactly the order the
//! transitions happened.
//!
//! Each connect attempt gets a fresh generation number. Workers present
//! their generation with every transition; once a newer connect or a manual
//! disconnect has moved the generation on, a stale worker's transitions are
//! ignored.
//!
//! | From                   | Event                 | To           |
//! |------------------------|-----------------------|--------------|
//! | Disconnected           | connect requested     | Connecting   |
//! | Connecting             | connect succeeded     | Connected    |
//! | Connecting             | connect failed        | Disconnected |
//! | Connected              | read loop error/close | Disconnected |
//! | Connected / Connecting | manual disconnect     | Disconnected |

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::{Mutex, mpsc, watch};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info};

use crate::types::{LinkEvent, LinkState, SensorRecord};

/// Dispatcher shared between the manager and its worker.
pub type SharedDispatcher = Arc<Mutex<Dispatcher>>;

/// Owns [`LinkState`] and the sending half of the subscriber channel.
#[derive(Debug)]
pub struct Dispatcher {
    state: LinkState,
    generation: u64,
    events: mpsc::UnboundedSender<LinkEvent>,
    state_tx: watch::Sender<LinkState>,
}

impl Dispatcher {
    /// Create a dispatcher with its event receiver and a state watch.
    pub fn new() -> (Self, LinkEvents, watch::Receiver<LinkState>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(LinkState::Disconnected);
        let dispatcher =
            Self { state: LinkState::Disconnected, generation: 0, events, state_tx };
        (dispatcher, LinkEvents::new(events_rx), state_rx)
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start a new attempt, superseding whatever held the slot.
    ///
    /// A live session is reported `Disconnected` before the new attempt
    /// begins. Returns the new attempt's generation.
    pub fn begin_connect(&mut self) -> u64 {
        if self.state == LinkState::Connected {
            self.emit(LinkEvent::Disconnected);
        }
        self.generation += 1;
        self.set_state(LinkState::Connecting);
        self.generation
    }

    /// Connecting -> Connected. Returns false if the attempt is stale.
    pub fn connect_succeeded(&mut self, generation: u64) -> bool {
        if !self.is_current(generation, LinkState::Connecting) {
            return false;
        }
        self.set_state(LinkState::Connected);
        self.emit(LinkEvent::Connected);
        true
    }

    /// Connecting -> Disconnected. No event: the subscriber never saw
    /// `Connected` for this attempt.
    pub fn connect_failed(&mut self, generation: u64) -> bool {
        if !self.is_current(generation, LinkState::Connecting) {
            return false;
        }
        self.set_state(LinkState::Disconnected);
        true
    }

    /// Deliver one record. Returns false once the session is stale, which
    /// tells the reader to stop.
    pub fn publish(&mut self, generation: u64, record: SensorRecord) -> bool {
        if !self.is_current(generation, LinkState::Connected) {
            return false;
        }
        self.emit(LinkEvent::RecordReceived(record));
        true
    }

    /// Connected -> Disconnected after the read loop ended on its own.
    pub fn session_ended(&mut self, generation: u64) -> bool {
        if !self.is_current(generation, LinkState::Connected) {
            return false;
        }
        self.set_state(LinkState::Disconnected);
        self.emit(LinkEvent::Disconnected);
        true
    }

    /// Manual disconnect. A no-op returning false when already
    /// disconnected; otherwise invalidates the current generation.
    pub fn cancel(&mut self) -> bool {
        match self.state {
            LinkState::Disconnected => false,
            previous => {
                self.generation += 1;
                self.set_state(LinkState::Disconnected);
                if previous == LinkState::Connected {
                    self.emit(LinkEvent::Disconnected);
                }
                true
            }
        }
    }

    fn is_current(&self, generation: u64, expected: LinkState) -> bool {
        let current = generation == self.generation && self.state == expected;
        if !current {
            debug!(
                generation,
                current_generation = self.generation,
                state = %self.state,
                "Ignoring stale transition"
            );
        }
        current
    }

    fn set_state(&mut self, state: LinkState) {
        if self.state != state {
            info!(generation = self.generation, "Link state {} -> {}", self.state, state);
        }
        self.state = state;
        self.state_tx.send_replace(state);
    }

    fn emit(&self, event: LinkEvent) {
        // The subscriber may have gone away; the link keeps running regardless.
        let _ = self.events.send(event);
    }
}

/// A worker's view of the dispatcher, pinned to one generation.
#[derive(Debug, Clone)]
pub struct SessionPublisher {
    dispatcher: SharedDispatcher,
    generation: u64,
}

impl SessionPublisher {
    pub fn new(dispatcher: SharedDispatcher, generation: u64) -> Self {
        Self { dispatcher, generation }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub async fn connected(&self) -> bool {
        self.dispatcher.lock().await.connect_succeeded(self.generation)
    }

    pub async fn connect_failed(&self) -> bool {
        self.dispatcher.lock().await.connect_failed(self.generation)
    }

    pub async fn record(&self, record: SensorRecord) -> bool {
        self.dispatcher.lock().await.publish(self.generation, record)
    }

    pub async fn ended(&self) -> bool {
        self.dispatcher.lock().await.session_ended(self.generation)
    }
}

/// Ordered, single-consumer stream of [`LinkEvent`]s.
#[derive(Debug)]
pub struct LinkEvents {
    inner: UnboundedReceiverStream<LinkEvent>,
}

impl LinkEvents {
    fn new(rx: mpsc::UnboundedReceiver<LinkEvent>) -> Self {
        Self { inner: UnboundedReceiverStream::new(rx) }
    }

    /// Wait for the next event. `None` once the manager is gone.
    pub async fn recv(&mut self) -> Option<LinkEvent> {
        self.inner.next().await
    }

    /// Take an already-queued event without waiting.
    pub fn try_recv(&mut self) -> Option<LinkEvent> {
        self.inner.as_mut().try_recv().ok()
    }
}

impl Stream for LinkEvents {
    type Item = LinkEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<LinkEvent>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
