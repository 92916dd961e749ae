//! Producer-facing stream handle
//!
//! A stream owns its decoder. Producers call [`Stream::push_sample`] from
//! their own threads; decoding happens there, under the stream's decoder
//! lock only, and the decoded sample is then queued on the presentation.

use crate::codecs::Decoder;
use crate::error::{MediaError, MediaResult};
use crate::events::AckSink;
use crate::format::{MajorType, MediaType, SampleFlags};
use crate::presentation::Presentation;
use crate::sample::Sample;
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, info, trace, warn};
use tsmf_core::{StreamId, TsmfError};

/// One elementary audio or video stream within a presentation
pub struct Stream {
    id: StreamId,
    presentation: Weak<Presentation>,
    decoder: Mutex<Option<Box<dyn Decoder>>>,
}

impl Stream {
    pub(crate) fn new(id: StreamId, presentation: Weak<Presentation>) -> Self {
        Self {
            id,
            presentation,
            decoder: Mutex::new(None),
        }
    }

    /// Stream identifier
    pub fn id(&self) -> StreamId {
        self.id
    }

    fn presentation(&self) -> MediaResult<Arc<Presentation>> {
        self.presentation.upgrade().ok_or_else(|| {
            TsmfError::InvalidState {
                expected: "live presentation".to_string(),
                actual: "presentation dropped".to_string(),
            }
            .into()
        })
    }

    /// Negotiate the stream's media type and bind a decoder.
    ///
    /// `decoder_name` picks a backend; `None` uses the configured default.
    /// An audio stream also fixes the presentation's audio format. If the
    /// decoder cannot be loaded the stream is left without one and later
    /// samples are rejected.
    pub fn set_format(&self, decoder_name: Option<&str>, media_type: &MediaType) -> MediaResult<()> {
        let presentation = self.presentation()?;

        match media_type.major_type {
            MajorType::Video => info!(
                stream_id = self.id,
                width = media_type.width,
                height = media_type.height,
                sub_type = ?media_type.sub_type,
                "video stream format"
            ),
            MajorType::Audio => info!(
                stream_id = self.id,
                sample_rate = media_type.samples_per_second.numerator,
                channels = media_type.channels,
                bits_per_sample = media_type.bits_per_sample,
                sub_type = ?media_type.sub_type,
                "audio stream format"
            ),
            MajorType::Unknown => debug!(stream_id = self.id, "stream format without major type"),
        }

        presentation.configure_stream(self.id, media_type)?;

        let name = decoder_name.unwrap_or(presentation.config().default_decoder.as_str());
        let loaded = presentation.backends().decoders.load(name, media_type);

        let mut slot = self.decoder.lock();
        match loaded {
            Ok(decoder) => {
                *slot = Some(decoder);
                Ok(())
            }
            Err(e) => {
                *slot = None;
                warn!(stream_id = self.id, decoder = name, error = %e, "failed to load decoder");
                Err(e)
            }
        }
    }

    /// Decode one compressed chunk and queue the result for playback.
    ///
    /// `ack` is invoked exactly once when the sample has been consumed.
    /// When decoding fails nothing is queued and `ack` is not invoked.
    #[allow(clippy::too_many_arguments)]
    pub fn push_sample(
        &self,
        ack: Arc<dyn AckSink>,
        sample_id: u32,
        start_time: u64,
        end_time: u64,
        duration: u64,
        flags: SampleFlags,
        data: &[u8],
    ) -> MediaResult<()> {
        let presentation = self.presentation()?;

        let (payload, pixel_format) = {
            let mut slot = self.decoder.lock();
            let decoder = slot.as_mut().ok_or(MediaError::DecoderNotConfigured {
                stream_id: self.id,
            })?;
            if let Err(e) = decoder.decode(data, flags) {
                warn!(stream_id = self.id, sample_id, error = %e, "decode failed");
                return Err(e);
            }
            (decoder.take_decoded(), decoder.decoded_format())
        };

        trace!(
            stream_id = self.id,
            sample_id,
            start_time,
            end_time,
            decoded = payload.as_ref().map_or(0, |p| p.len()),
            "sample queued"
        );

        let sample = Sample::new(
            self.id,
            ack,
            sample_id,
            start_time,
            end_time,
            duration,
            payload,
            pixel_format,
        );
        presentation.enqueue(sample)
    }

    /// Mark the stream as ended
    pub fn end(&self) -> MediaResult<()> {
        self.presentation()?.end_stream(self.id)
    }

    /// Major type negotiated by [`Stream::set_format`]
    pub fn major_type(&self) -> MajorType {
        self.presentation
            .upgrade()
            .map_or(MajorType::Unknown, |p| p.stream_major_type(self.id))
    }

    /// Whether end of stream has been signalled since the last flush
    pub fn is_eos(&self) -> bool {
        self.presentation
            .upgrade()
            .map_or(false, |p| p.stream_eos(self.id))
    }

    /// Whether a decoder is bound
    pub fn has_decoder(&self) -> bool {
        self.decoder.lock().is_some()
    }

    pub(crate) fn release_decoder(&self) {
        if let Some(decoder) = self.decoder.lock().take() {
            debug!(stream_id = self.id, decoder = decoder.name(), "decoder released");
        }
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("id", &self.id)
            .field("has_decoder", &self.has_decoder())
            .finish()
    }
}
