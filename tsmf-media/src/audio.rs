//! Audio output sink interfaces and backend registry

use crate::error::{MediaError, MediaResult};
use crate::format::AudioFormat;
use crate::sample::Payload;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// An opened audio output.
///
/// Dropping the sink releases the device.
pub trait AudioSink: Send {
    /// Configure the output format
    fn set_format(&mut self, format: AudioFormat) -> MediaResult<()>;

    /// Queue decoded PCM for playback; the sink takes ownership
    fn play(&mut self, payload: Payload) -> MediaResult<()>;

    /// Discard everything queued but not yet played
    fn flush(&mut self);

    /// Number of buffers queued but not yet played
    fn queue_length(&self) -> usize;
}

/// Opens audio sinks for a backend
pub trait AudioSinkFactory: Send + Sync {
    /// Open the given device, or the backend's default device
    fn open(&self, device: Option<&str>) -> MediaResult<Box<dyn AudioSink>>;
}

impl<F> AudioSinkFactory for F
where
    F: Fn(Option<&str>) -> MediaResult<Box<dyn AudioSink>> + Send + Sync,
{
    fn open(&self, device: Option<&str>) -> MediaResult<Box<dyn AudioSink>> {
        self(device)
    }
}

/// Audio backend registry for selecting an output by name
#[derive(Clone, Default)]
pub struct AudioSinkRegistry {
    factories: HashMap<String, Arc<dyn AudioSinkFactory>>,
}

impl AudioSinkRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend, replacing any previous one with the same name
    pub fn register<F: AudioSinkFactory + 'static>(&mut self, name: &str, factory: F) {
        self.factories.insert(name.to_string(), Arc::new(factory));
    }

    /// List registered backend names
    pub fn list(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Whether no backend is registered
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Open a sink on the named backend and configure it for `format`
    pub fn open(
        &self,
        name: &str,
        device: Option<&str>,
        format: AudioFormat,
    ) -> MediaResult<Box<dyn AudioSink>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| MediaError::UnknownAudioBackend {
                name: name.to_string(),
            })?;

        let mut sink = factory.open(device)?;
        sink.set_format(format)?;
        debug!(
            backend = name,
            device = device.unwrap_or("default"),
            sample_rate = format.sample_rate,
            channels = format.channels,
            bits_per_sample = format.bits_per_sample,
            "audio sink opened"
        );
        Ok(sink)
    }
}

impl fmt::Debug for AudioSinkRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioSinkRegistry")
            .field("backends", &self.list())
            .finish()
    }
}
