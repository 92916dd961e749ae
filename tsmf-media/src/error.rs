//! Media container error types and handling
//!
//! This module defines the error types used by the media container, covering
//! decoder and audio backend failures as well as the presentation/stream
//! bookkeeping errors raised by `tsmf-core`.

use thiserror::Error;
use tsmf_core::{StreamId, TsmfError};

/// Main error type for media container operations
#[derive(Error, Debug)]
pub enum MediaError {
    /// Presentation or stream bookkeeping failed
    #[error(transparent)]
    Core(#[from] TsmfError),

    /// I/O operation failed (thread spawn, device access)
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Decoding operation failed
    #[error("Decoding failed: {codec} - {reason}")]
    DecodingFailed {
        /// Codec name
        codec: String,
        /// Failure reason
        reason: String,
    },

    /// Chunk pushed to a stream that has no decoder bound
    #[error("No decoder configured for stream {stream_id}")]
    DecoderNotConfigured {
        /// Stream identifier
        stream_id: StreamId,
    },

    /// Codec initialization failed
    #[error("Codec initialization failed: {codec} - {reason}")]
    CodecInitializationFailed {
        /// Codec name
        codec: String,
        /// Failure reason
        reason: String,
    },

    /// Unsupported format error
    #[error("Unsupported format: {format}")]
    UnsupportedFormat {
        /// Format description
        format: String,
    },

    /// No decoder backend registered under this name
    #[error("Unknown decoder backend: {name}")]
    UnknownDecoder {
        /// Requested backend name
        name: String,
    },

    /// No audio backend registered under this name
    #[error("Unknown audio backend: {name}")]
    UnknownAudioBackend {
        /// Requested backend name
        name: String,
    },

    /// Audio specific errors
    #[error("Audio error: {message}")]
    Audio {
        /// Error message
        message: String,
    },

    /// Event or acknowledgment could not be delivered to the host
    #[error("Event delivery failed: {reason}")]
    DeliveryFailed {
        /// Failure reason
        reason: String,
    },

    /// Memory allocation failed
    #[error("Memory allocation failed: {size} bytes")]
    MemoryAllocationFailed {
        /// Size that failed to allocate
        size: usize,
    },
}

/// Result type alias for media operations
pub type MediaResult<T> = Result<T, MediaError>;

impl MediaError {
    /// Check if error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            MediaError::Core(inner) => inner.is_recoverable(),
            MediaError::Io { .. } => true,
            MediaError::DecodingFailed { .. } => true,
            MediaError::DecoderNotConfigured { .. } => true,
            MediaError::DeliveryFailed { .. } => true,
            MediaError::MemoryAllocationFailed { .. } => true,
            MediaError::Audio { .. } => true,
            MediaError::CodecInitializationFailed { .. } => false,
            MediaError::UnsupportedFormat { .. } => false,
            MediaError::UnknownDecoder { .. } => false,
            MediaError::UnknownAudioBackend { .. } => false,
        }
    }

    /// Get error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            MediaError::Core(TsmfError::InvalidConfiguration { .. }) => ErrorCategory::Configuration,
            MediaError::Core(TsmfError::InvalidState { .. }) => ErrorCategory::State,
            MediaError::Core(_) => ErrorCategory::Session,
            MediaError::Io { .. } => ErrorCategory::System,
            MediaError::DecodingFailed { .. } => ErrorCategory::Codec,
            MediaError::DecoderNotConfigured { .. } => ErrorCategory::State,
            MediaError::CodecInitializationFailed { .. } => ErrorCategory::Codec,
            MediaError::UnsupportedFormat { .. } => ErrorCategory::Format,
            MediaError::UnknownDecoder { .. } => ErrorCategory::Configuration,
            MediaError::UnknownAudioBackend { .. } => ErrorCategory::Configuration,
            MediaError::Audio { .. } => ErrorCategory::Audio,
            MediaError::DeliveryFailed { .. } => ErrorCategory::Delivery,
            MediaError::MemoryAllocationFailed { .. } => ErrorCategory::Memory,
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// System-level errors (I/O, threads)
    System,
    /// Configuration and backend selection errors
    Configuration,
    /// Presentation and stream bookkeeping errors
    Session,
    /// Codec-related errors
    Codec,
    /// Format and data structure errors
    Format,
    /// State management errors
    State,
    /// Memory management errors
    Memory,
    /// Audio-specific errors
    Audio,
    /// Host event/ack delivery errors
    Delivery,
}
