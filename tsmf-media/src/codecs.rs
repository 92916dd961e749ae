//! Decoder interfaces and backend registry
//!
//! Decoding itself is done by pluggable backends. A stream binds one decoder
//! instance when its format is negotiated and drives it synchronously from
//! the producer's thread.

use crate::error::{MediaError, MediaResult};
use crate::format::{MajorType, MediaType, PixelFormat, SampleFlags};
use crate::sample::Payload;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A stateful decoder bound to one stream.
///
/// Dropping the decoder releases it.
pub trait Decoder: Send {
    /// Backend name, for logs and errors
    fn name(&self) -> &str;

    /// Configure for the stream's media type
    fn set_format(&mut self, media_type: &MediaType) -> MediaResult<()>;

    /// Decode one compressed chunk
    fn decode(&mut self, data: &[u8], flags: SampleFlags) -> MediaResult<()>;

    /// Take the output of the last `decode`, if any. Ownership moves to the
    /// caller; `None` means the decoder is holding the data back.
    fn take_decoded(&mut self) -> Option<Payload>;

    /// Layout of decoded video frames
    fn decoded_format(&self) -> PixelFormat {
        PixelFormat::I420
    }
}

/// Creates decoder instances for a backend
pub trait DecoderFactory: Send + Sync {
    /// Create an unconfigured decoder
    fn create(&self) -> MediaResult<Box<dyn Decoder>>;
}

impl<F> DecoderFactory for F
where
    F: Fn() -> MediaResult<Box<dyn Decoder>> + Send + Sync,
{
    fn create(&self) -> MediaResult<Box<dyn Decoder>> {
        self()
    }
}

/// Decoder that treats each chunk as already decoded.
///
/// Used for uncompressed streams (PCM audio, raw I420 video) and as the
/// default backend.
#[derive(Debug, Default)]
pub struct PassthroughDecoder {
    major_type: MajorType,
    decoded: Option<Payload>,
}

impl PassthroughDecoder {
    /// Backend name under which the registry exposes this decoder
    pub const NAME: &'static str = "passthrough";

    /// Create an unconfigured decoder
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for PassthroughDecoder {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn set_format(&mut self, media_type: &MediaType) -> MediaResult<()> {
        if media_type.major_type == MajorType::Unknown {
            return Err(MediaError::CodecInitializationFailed {
                codec: Self::NAME.to_string(),
                reason: "media type has no major type".to_string(),
            });
        }
        self.major_type = media_type.major_type;
        Ok(())
    }

    fn decode(&mut self, data: &[u8], _flags: SampleFlags) -> MediaResult<()> {
        self.decoded = None;
        if self.major_type == MajorType::Unknown {
            return Err(MediaError::DecodingFailed {
                codec: Self::NAME.to_string(),
                reason: "format not set".to_string(),
            });
        }
        if data.is_empty() {
            return Err(MediaError::DecodingFailed {
                codec: Self::NAME.to_string(),
                reason: "empty chunk".to_string(),
            });
        }
        self.decoded = Some(Payload::copy_from_slice(data)?);
        Ok(())
    }

    fn take_decoded(&mut self) -> Option<Payload> {
        self.decoded.take()
    }
}

/// Decoder registry for selecting a backend by name
#[derive(Clone, Default)]
pub struct DecoderRegistry {
    factories: HashMap<String, Arc<dyn DecoderFactory>>,
}

impl DecoderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in backends
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            PassthroughDecoder::NAME,
            || -> MediaResult<Box<dyn Decoder>> { Ok(Box::new(PassthroughDecoder::new())) },
        );
        registry
    }

    /// Register a backend, replacing any previous one with the same name
    pub fn register<F: DecoderFactory + 'static>(&mut self, name: &str, factory: F) {
        self.factories.insert(name.to_string(), Arc::new(factory));
    }

    /// List registered backend names
    pub fn list(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Whether a backend is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Create a decoder from the named backend and configure it for
    /// `media_type`
    pub fn load(&self, name: &str, media_type: &MediaType) -> MediaResult<Box<dyn Decoder>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| MediaError::UnknownDecoder {
                name: name.to_string(),
            })?;

        let mut decoder = factory.create()?;
        decoder.set_format(media_type)?;
        debug!(
            decoder = name,
            major_type = ?media_type.major_type,
            sub_type = ?media_type.sub_type,
            "decoder loaded"
        );
        Ok(decoder)
    }
}

impl fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderRegistry")
            .field("backends", &self.list())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::SubType;

    #[test]
    fn test_passthrough_copies_chunk() {
        let mut decoder = PassthroughDecoder::new();
        decoder
            .set_format(&MediaType::audio(SubType::Pcm, 48000, 2, 16))
            .unwrap();

        decoder.decode(&[1, 2, 3, 4], SampleFlags::CLEANPOINT).unwrap();
        assert_eq!(decoder.take_decoded().unwrap().as_slice(), &[1, 2, 3, 4]);
        assert!(decoder.take_decoded().is_none());
    }

    #[test]
    fn test_passthrough_rejects_empty_chunk() {
        let mut decoder = PassthroughDecoder::new();
        decoder
            .set_format(&MediaType::video(SubType::Unknown, 2, 2))
            .unwrap();

        assert!(matches!(
            decoder.decode(&[], SampleFlags::empty()),
            Err(MediaError::DecodingFailed { .. })
        ));
        assert!(decoder.take_decoded().is_none());
    }

    #[test]
    fn test_registry_loads_default_backend() {
        let registry = DecoderRegistry::with_defaults();
        assert!(registry.contains("passthrough"));

        let decoder = registry
            .load("passthrough", &MediaType::video(SubType::H264, 640, 480))
            .unwrap();
        assert_eq!(decoder.name(), "passthrough");
        assert_eq!(decoder.decoded_format(), PixelFormat::I420);
    }

    #[test]
    fn test_registry_unknown_backend() {
        let registry = DecoderRegistry::with_defaults();
        let result = registry.load("ffmpeg", &MediaType::default());
        assert!(matches!(result, Err(MediaError::UnknownDecoder { name }) if name == "ffmpeg"));
    }

    #[test]
    fn test_registry_rejected_format() {
        let registry = DecoderRegistry::with_defaults();
        let result = registry.load("passthrough", &MediaType::default());
        assert!(matches!(
            result,
            Err(MediaError::CodecInitializationFailed { .. })
        ));
    }
}
