//! Events delivered to the link subscriber

use super::SensorRecord;

/// One event on the ordered subscriber channel.
///
/// A session always reads as `Connected`, zero or more `RecordReceived`
/// in arrival order, then `Disconnected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Connected,
    Disconnected,
    RecordReceived(SensorRecord),
}

impl LinkEvent {
    /// The carried record, if this is a data event.
    pub fn record(&self) -> Option<&SensorRecord> {
        match self {
            LinkEvent::RecordReceived(record) => Some(record),
            _ => None,
        }
    }
}
