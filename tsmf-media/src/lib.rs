//! # TSMF Media
//!
//! Media container for remote-desktop audio/video redirection. Decoded
//! samples arrive per stream from producer threads; one playback thread per
//! presentation releases them to the audio sink and the display in an order
//! that keeps audio and video in step.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tsmf_core::{PlaybackConfig, PresentationId, Rect};
//! use tsmf_media::*;
//!
//! # fn main() -> MediaResult<()> {
//! let (events, _event_rx) = tokio::sync::mpsc::unbounded_channel::<PlaybackEvent>();
//! let (acks, _ack_rx) = tokio::sync::mpsc::unbounded_channel::<SampleAck>();
//! let acks: Arc<dyn AckSink> = Arc::new(acks);
//!
//! let registry = PresentationRegistry::new(PlaybackConfig::default(), MediaBackends::with_defaults())?;
//! let presentation = registry.create(PresentationId::new_v4(), Arc::new(events))?;
//!
//! let video = presentation.create_stream(1)?;
//! video.set_format(None, &MediaType::video(SubType::Unknown, 320, 240))?;
//! presentation.set_geometry(Rect::new(0, 0, 320, 240));
//! presentation.start()?;
//!
//! let frame = vec![0u8; 320 * 240 * 3 / 2];
//! video.push_sample(acks.clone(), 1, 0, 333_333, 333_333, SampleFlags::CLEANPOINT, &frame)?;
//!
//! presentation.stop();
//! registry.remove(presentation.id())?;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

pub mod audio;
pub mod codecs;
pub mod error;
pub mod events;
pub mod format;
pub mod playback;
pub mod presentation;
pub mod registry;
pub mod sample;
mod scheduler;
pub mod stream;

pub use audio::{AudioSink, AudioSinkFactory, AudioSinkRegistry};
pub use codecs::{Decoder, DecoderFactory, DecoderRegistry, PassthroughDecoder};
pub use error::{ErrorCategory, MediaError, MediaResult};
pub use events::{AckSink, EventSink, PlaybackEvent, SampleAck, VideoFrameEvent};
pub use format::{AudioFormat, Fraction, MajorType, MediaType, PixelFormat, SampleFlags, SubType};
pub use playback::PlaybackState;
pub use presentation::Presentation;
pub use registry::{MediaBackends, PresentationRegistry};
pub use sample::{Payload, Sample};
pub use stream::Stream;
