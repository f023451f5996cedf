//! Callback-style subscriber interface

use tracing::debug;

use crate::dispatch::LinkEvents;
use crate::types::{LinkEvent, SensorRecord};

/// Receives link events in emission order.
///
/// Callbacks run on whichever task drives [`LinkEvents::forward_to`], never
/// on the link worker, so a slow sink delays only its own queue.
pub trait EventSink {
    fn on_connected(&mut self) {}

    fn on_disconnected(&mut self) {}

    fn on_record(&mut self, record: SensorRecord);
}

/// Hand one event to the matching callback.
pub fn deliver<S: EventSink + ?Sized>(sink: &mut S, event: LinkEvent) {
    match event {
        LinkEvent::Connected => sink.on_connected(),
        LinkEvent::Disconnected => sink.on_disconnected(),
        LinkEvent::RecordReceived(record) => sink.on_record(record),
    }
}

impl LinkEvents {
    /// Deliver every event to `sink` until the manager is dropped.
    ///
    /// Returns the number of events delivered.
    pub async fn forward_to<S: EventSink + ?Sized>(mut self, sink: &mut S) -> u64 {
        let mut delivered = 0u64;
        while let Some(event) = self.recv().await {
            deliver(sink, event);
            delivered += 1;
        }
        debug!(delivered, "Event stream closed");
        delivered
    }
}
