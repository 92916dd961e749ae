//! Events and acknowledgments delivered to the host
//!
//! The playback thread reports two things upward: display events (a decoded
//! video frame is ready, or a screen region needs to be repainted) and
//! per-sample acknowledgments that let the producer reclaim or credit the
//! chunk it sent. Both are fire-and-forget.

use crate::error::{MediaError, MediaResult};
use crate::format::PixelFormat;
use crate::sample::Payload;
use tokio::sync::mpsc;
use tsmf_core::Rect;

/// Decoded video frame ready for compositing
#[derive(Debug)]
pub struct VideoFrameEvent {
    /// Frame bytes; the event owns them
    pub payload: Payload,
    /// Pixel layout of `payload`
    pub pixel_format: PixelFormat,
    /// Frame width in pixels
    pub frame_width: u32,
    /// Frame height in pixels
    pub frame_height: u32,
    /// Where the frame goes on screen
    pub output: Rect,
}

impl VideoFrameEvent {
    /// Frame size in bytes
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}

/// Display events produced by a presentation
#[derive(Debug)]
pub enum PlaybackEvent {
    /// A decoded frame should be drawn
    VideoFrame(VideoFrameEvent),
    /// A region previously covered by video should be repainted
    Redraw(Rect),
}

impl PlaybackEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            PlaybackEvent::VideoFrame(_) => "video_frame",
            PlaybackEvent::Redraw(_) => "redraw",
        }
    }
}

/// Acknowledgment of a dispatched sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleAck {
    /// Sample id as pushed by the producer
    pub sample_id: u32,
    /// Sample duration
    pub duration: u64,
    /// Decoded size in bytes
    pub size: u32,
}

/// Receives display events.
///
/// Ownership of the event passes to the sink. A sink that cannot deliver it
/// returns an error and drops the event, which frees any payload it held.
pub trait EventSink: Send + Sync {
    /// Deliver one event
    fn push_event(&self, event: PlaybackEvent) -> MediaResult<()>;
}

/// Receives per-sample acknowledgments
pub trait AckSink: Send + Sync {
    /// Report that `sample_id` has been consumed
    fn ack(&self, sample_id: u32, duration: u64, size: u32);
}

impl EventSink for mpsc::UnboundedSender<PlaybackEvent> {
    fn push_event(&self, event: PlaybackEvent) -> MediaResult<()> {
        self.send(event).map_err(|e| MediaError::DeliveryFailed {
            reason: format!("event receiver closed, dropped {}", e.0.event_type()),
        })
    }
}

impl AckSink for mpsc::UnboundedSender<SampleAck> {
    fn ack(&self, sample_id: u32, duration: u64, size: u32) {
        // Nobody is listening for credits any more; nothing to do.
        let _ = self.send(SampleAck {
            sample_id,
            duration,
            size,
        });
    }
}
