//! Decoded payload buffers and the timestamped samples that carry them

use crate::error::{MediaError, MediaResult};
use crate::events::AckSink;
use crate::format::PixelFormat;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use tsmf_core::StreamId;

/// Decoded media buffer.
///
/// Move-only: whoever holds the `Payload` owns the bytes, and handing it to
/// a sink or an event gives the bytes away. There is no `Clone`.
pub struct Payload {
    data: Vec<u8>,
}

impl Payload {
    /// Wrap an already decoded buffer
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Copy `data` into a freshly allocated payload, reporting allocation
    /// failure instead of aborting
    pub fn copy_from_slice(data: &[u8]) -> MediaResult<Self> {
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(data.len())
            .map_err(|_| MediaError::MemoryAllocationFailed { size: data.len() })?;
        buffer.extend_from_slice(data);
        Ok(Self { data: buffer })
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True for a zero-length payload
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Take the underlying buffer
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Convert into a shareable, immutable buffer without copying
    pub fn freeze(self) -> Bytes {
        Bytes::from(self.data)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl AsRef<[u8]> for Payload {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload").field("len", &self.data.len()).finish()
    }
}

/// One decoded, timestamped unit waiting in a stream queue
pub struct Sample {
    /// Producer-assigned sample id, echoed back in the acknowledgment
    pub sample_id: u32,
    /// Presentation start time
    pub start_time: u64,
    /// Presentation end time
    pub end_time: u64,
    /// Duration as reported by the producer
    pub duration: u64,
    /// Owning stream
    pub stream_id: StreamId,
    /// Decoded bytes; `None` when the decoder buffered internally or once
    /// the payload has been handed off
    pub payload: Option<Payload>,
    /// Layout of decoded video payloads
    pub pixel_format: PixelFormat,
    data_size: u32,
    ack: Arc<dyn AckSink>,
}

impl Sample {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        stream_id: StreamId,
        ack: Arc<dyn AckSink>,
        sample_id: u32,
        start_time: u64,
        end_time: u64,
        duration: u64,
        payload: Option<Payload>,
        pixel_format: PixelFormat,
    ) -> Self {
        let data_size = payload
            .as_ref()
            .map(|p| u32::try_from(p.len()).unwrap_or(u32::MAX))
            .unwrap_or(0);
        Self {
            sample_id,
            start_time,
            end_time,
            duration,
            stream_id,
            payload,
            pixel_format,
            data_size,
            ack,
        }
    }

    /// Decoded size recorded when the sample was created
    pub fn data_size(&self) -> u32 {
        self.data_size
    }

    /// Hand the payload off, leaving the sample empty
    pub fn take_payload(&mut self) -> Option<Payload> {
        self.payload.take()
    }

    /// Notify the producer that this sample's resources can be reclaimed,
    /// consuming the sample
    pub(crate) fn acknowledge(self) {
        self.ack.ack(self.sample_id, self.duration, self.data_size);
    }
}

impl fmt::Debug for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sample")
            .field("sample_id", &self.sample_id)
            .field("stream_id", &self.stream_id)
            .field("start_time", &self.start_time)
            .field("end_time", &self.end_time)
            .field("duration", &self.duration)
            .field("payload", &self.payload)
            .finish()
    }
}
