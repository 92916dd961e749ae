//! Playback configuration types and defaults

use crate::error::{TsmfError, TsmfResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning knobs for a presentation's playback thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Audio is released to the sink only while its pending queue is
    /// shorter than this
    pub audio_queue_threshold: usize,
    /// How long the playback loop waits when nothing is eligible
    pub idle_interval: Duration,
    /// Poll interval used by `stop()` while waiting for the thread
    pub stop_poll_interval: Duration,
    /// Poll interval while waiting for the audio sink to empty on drain
    pub audio_drain_poll_interval: Duration,
    /// Upper bound on the audio drain wait
    pub audio_drain_timeout: Duration,
    /// Decoder backend used when the caller does not name one
    pub default_decoder: String,
    /// Audio backend used when the presentation does not name one
    pub default_audio_sink: Option<String>,
}

impl PlaybackConfig {
    /// Shorter waits, for interactive sessions on fast links
    pub fn low_latency() -> Self {
        Self {
            audio_queue_threshold: 4,
            idle_interval: Duration::from_millis(2),
            stop_poll_interval: Duration::from_millis(20),
            ..Self::default()
        }
    }

    /// Millisecond-scale waits so test suites do not sleep for long
    pub fn testing() -> Self {
        Self {
            idle_interval: Duration::from_millis(1),
            stop_poll_interval: Duration::from_millis(5),
            audio_drain_poll_interval: Duration::from_millis(1),
            audio_drain_timeout: Duration::from_millis(500),
            ..Self::default()
        }
    }

    /// Reject values that would stall or spin the playback loop
    pub fn validate(&self) -> TsmfResult<()> {
        if self.audio_queue_threshold == 0 {
            return Err(invalid(
                "audio_queue_threshold",
                "must be at least 1 or audio never plays",
            ));
        }
        for (field, value) in [
            ("idle_interval", self.idle_interval),
            ("stop_poll_interval", self.stop_poll_interval),
            ("audio_drain_poll_interval", self.audio_drain_poll_interval),
        ] {
            if value.is_zero() {
                return Err(invalid(field, "must be non-zero"));
            }
        }
        if self.default_decoder.is_empty() {
            return Err(invalid("default_decoder", "must name a decoder backend"));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> TsmfError {
    TsmfError::InvalidConfiguration {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            audio_queue_threshold: 10,
            idle_interval: Duration::from_millis(10),
            stop_poll_interval: Duration::from_millis(250),
            audio_drain_poll_interval: Duration::from_millis(10),
            audio_drain_timeout: Duration::from_secs(5),
            default_decoder: "passthrough".to_string(),
            default_audio_sink: None,
        }
    }
}
