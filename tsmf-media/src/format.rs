//! Media format descriptors negotiated per stream

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Major media type of a stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MajorType {
    /// Video track
    Video,
    /// Audio track
    Audio,
    /// Not negotiated yet, or a type this container does not render
    #[default]
    Unknown,
}

/// Codec subtype announced for a stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubType {
    /// Windows Media Video 9 Advanced Profile (VC-1)
    Wvc1,
    /// Windows Media Audio 2
    Wma2,
    /// Windows Media Audio 9 Professional
    Wma9,
    /// MPEG-1 Layer 3 audio
    Mp3,
    /// MPEG-2 audio
    Mp2a,
    /// MPEG-2 video
    Mp2v,
    /// H.264 / AVC video
    H264,
    /// AAC audio
    Aac,
    /// Uncompressed PCM audio
    Pcm,
    /// Anything else
    #[default]
    Unknown,
}

/// Rational value, used for frame rate and sample rate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fraction {
    /// Numerator
    pub numerator: u32,
    /// Denominator
    pub denominator: u32,
}

impl Fraction {
    /// Create a fraction
    pub fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Floating point value, zero when the denominator is zero
    pub fn as_f64(&self) -> f64 {
        if self.denominator == 0 {
            0.0
        } else {
            self.numerator as f64 / self.denominator as f64
        }
    }
}

/// Parsed media type of a stream, as handed over by the protocol layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaType {
    /// Major type
    pub major_type: MajorType,
    /// Codec subtype
    pub sub_type: SubType,
    /// Video width in pixels
    pub width: u32,
    /// Video height in pixels
    pub height: u32,
    /// Bit rate in bits per second
    pub bit_rate: u32,
    /// Frame rate for video, sample rate (numerator) for audio
    pub samples_per_second: Fraction,
    /// Audio channel count
    pub channels: u32,
    /// Audio bits per sample, 0 when the format does not say
    pub bits_per_sample: u32,
    /// Audio block alignment
    pub block_align: u32,
    /// Codec private data
    pub extra_data: Vec<u8>,
}

impl MediaType {
    /// Video media type with the given subtype and dimensions
    pub fn video(sub_type: SubType, width: u32, height: u32) -> Self {
        Self {
            major_type: MajorType::Video,
            sub_type,
            width,
            height,
            ..Self::default()
        }
    }

    /// Audio media type with the given subtype and PCM parameters
    pub fn audio(sub_type: SubType, sample_rate: u32, channels: u32, bits_per_sample: u32) -> Self {
        Self {
            major_type: MajorType::Audio,
            sub_type,
            samples_per_second: Fraction::new(sample_rate, 1),
            channels,
            bits_per_sample,
            ..Self::default()
        }
    }
}

/// Output format negotiated with the audio sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count
    pub channels: u32,
    /// Bits per sample
    pub bits_per_sample: u32,
}

impl AudioFormat {
    /// Bits per sample assumed when the media type reports none
    pub const DEFAULT_BITS_PER_SAMPLE: u32 = 16;

    /// Derive the sink format from an audio media type
    pub fn from_media_type(media_type: &MediaType) -> Self {
        let bits_per_sample = match media_type.bits_per_sample {
            0 => Self::DEFAULT_BITS_PER_SAMPLE,
            bits => bits,
        };
        Self {
            sample_rate: media_type.samples_per_second.numerator,
            channels: media_type.channels,
            bits_per_sample,
        }
    }

    /// True once rate, channels and sample size are all known
    pub fn is_complete(&self) -> bool {
        self.sample_rate != 0 && self.channels != 0 && self.bits_per_sample != 0
    }
}

/// Pixel layout of decoded video frames
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Planar YUV 4:2:0, Y then U then V
    #[default]
    I420,
    /// Planar YUV 4:2:0, Y then V then U
    Yv12,
}

bitflags! {
    /// Sample extension flags carried with each pushed chunk
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct SampleFlags: u32 {
        /// Chunk is a clean point (keyframe)
        const CLEANPOINT = 0x0000_0001;
        /// Chunk follows a gap in the stream
        const DISCONTINUITY = 0x0000_0002;
        /// Interlaced frame
        const INTERLACED = 0x0000_0004;
        /// Bottom field is displayed first
        const BOTTOM_FIELD_FIRST = 0x0000_0008;
        /// First field is repeated
        const REPEAT_FIELD_FIRST = 0x0000_0010;
        /// Frame carries a single field
        const SINGLE_FIELD = 0x0000_0020;
        /// Single field derived from the top field
        const DERIVED_FROM_TOP_FIELD = 0x0000_0040;
        /// Timestamps are not meaningful
        const HAS_NO_TIMESTAMPS = 0x0000_0080;
        /// Timestamps are relative to the previous sample
        const RELATIVE_TIMESTAMPS = 0x0000_0100;
        /// Timestamps are absolute
        const ABSOLUTE_TIMESTAMPS = 0x0000_0200;
    }
}
