//! Read loop turning the byte stream into published records

use futures::StreamExt;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::LinkError;
use crate::codec::SensorFrameCodec;
use crate::dispatch::SessionPublisher;
use crate::transport::Connection;

/// How a read loop ended.
#[derive(Debug)]
pub enum ReadOutcome {
    /// Cancelled from outside (manual disconnect or a newer connect).
    Cancelled,
    /// The dispatcher moved on to a newer session mid-loop.
    Superseded,
    /// The peer closed the stream on a frame boundary.
    Closed,
    /// Read error, or the stream ended mid-frame, or a frame failed to decode.
    Failed(LinkError),
}

/// Owns an open connection and reads fixed-width frames from it.
pub struct FrameReader {
    frames: FramedRead<Connection, SensorFrameCodec>,
    records: u64,
}

impl FrameReader {
    pub fn new(connection: Connection) -> Self {
        Self { frames: FramedRead::new(connection, SensorFrameCodec::new()), records: 0 }
    }

    /// Read until the stream ends, fails, or `cancel` fires.
    ///
    /// Each decoded record is published before the next read. The
    /// connection is closed before `Disconnected` is published, so a
    /// subscriber that sees the event can reconnect straight away.
    pub async fn run(mut self, cancel: &CancellationToken, publisher: &SessionPublisher) -> ReadOutcome {
        let peer = self.frames.get_ref().peer().clone();
        info!(peer = %peer, generation = publisher.generation(), "Frame reader started");

        let outcome = loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break ReadOutcome::Cancelled,
                next = self.frames.next() => next,
            };

            match next {
                Some(Ok(record)) => {
                    self.records += 1;
                    debug!(peer = %peer, record = %record, "Record received");
                    if !publisher.record(record).await {
                        break ReadOutcome::Superseded;
                    }
                }
                Some(Err(e)) => {
                    warn!(peer = %peer, "Link read failed: {}", e);
                    break ReadOutcome::Failed(e);
                }
                None => {
                    info!(peer = %peer, "Peer closed the stream");
                    break ReadOutcome::Closed;
                }
            }
        };

        let records = self.records;
        drop(self.frames);

        if matches!(outcome, ReadOutcome::Closed | ReadOutcome::Failed(_)) {
            publisher.ended().await;
        }

        info!(peer = %peer, records, "Frame reader ended");
        outcome
    }
}
