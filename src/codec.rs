//! Fixed-width frame decoding.
//!
//! The rig writes an unbroken byte stream with no delimiter or length prefix.
//! Every [`RECORD_SIZE`] bytes is one frame of six comma-separated text
//! fields. [`SensorFrameCodec`] slices the stream and keeps any partial
//! frame buffered across reads, so chunk boundaries on the transport never
//! matter.

use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::types::{FIELD_COUNT, FIELD_SEPARATOR, RECORD_SIZE, SensorRecord};
use crate::{FramingFault, LinkError, Result};

/// Decode one complete frame into a record.
///
/// The frame must be exactly [`RECORD_SIZE`] bytes and split into exactly
/// [`FIELD_COUNT`] fields. Field text is kept verbatim, including
/// surrounding whitespace and empty fields. Bytes that are not valid UTF-8
/// decode to U+FFFD.
pub fn decode_record(frame: &[u8]) -> Result<SensorRecord> {
    if frame.len() != RECORD_SIZE {
        return Err(LinkError::framing(FramingFault::FrameLength { len: frame.len() }));
    }

    let text = String::from_utf8_lossy(frame);
    let separator = char::from(FIELD_SEPARATOR);

    let found = text.split(separator).count();
    if found != FIELD_COUNT {
        return Err(LinkError::framing(FramingFault::FieldCount { found }));
    }

    let mut parts = text.split(separator);
    let fields = std::array::from_fn(|_| parts.next().unwrap_or_default().to_string());
    Ok(SensorRecord::from_fields(fields))
}

/// Stream decoder yielding one [`SensorRecord`] per frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct SensorFrameCodec;

impl SensorFrameCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for SensorFrameCodec {
    type Item = SensorRecord;
    type Error = LinkError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<SensorRecord>> {
        if src.len() < RECORD_SIZE {
            src.reserve(RECORD_SIZE - src.len());
            return Ok(None);
        }

        let frame = src.split_to(RECORD_SIZE);
        let record = decode_record(&frame)?;
        trace!(buffered = src.len(), "Decoded frame");
        Ok(Some(record))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<SensorRecord>> {
        match self.decode(src)? {
            Some(record) => Ok(Some(record)),
            None if src.is_empty() => Ok(None),
            None => Err(LinkError::framing(FramingFault::ShortFrame { received: src.len() })),
        }
    }
}
