//! Error types for the TSMF container

use crate::ids::{PresentationId, StreamId};
use thiserror::Error;

/// Core error type for presentation and stream bookkeeping
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TsmfError {
    /// A presentation with this id is already registered
    #[error("Duplicate presentation: {id}")]
    DuplicatePresentation {
        /// Offending presentation id
        id: PresentationId,
    },

    /// No presentation is registered under this id
    #[error("Presentation not found: {id}")]
    PresentationNotFound {
        /// Requested presentation id
        id: PresentationId,
    },

    /// A stream with this id already exists in the presentation
    #[error("Duplicate stream {stream_id} in presentation {presentation}")]
    DuplicateStream {
        /// Owning presentation
        presentation: PresentationId,
        /// Offending stream id
        stream_id: StreamId,
    },

    /// The presentation has no stream with this id
    #[error("Stream {stream_id} not found in presentation {presentation}")]
    StreamNotFound {
        /// Owning presentation
        presentation: PresentationId,
        /// Requested stream id
        stream_id: StreamId,
    },

    /// Operation not valid in the current state
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// Expected state
        expected: String,
        /// Actual state
        actual: String,
    },

    /// Configuration value rejected by validation
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfiguration {
        /// Configuration field
        field: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Result type alias for core operations
pub type TsmfResult<T> = Result<T, TsmfError>;

impl TsmfError {
    /// Whether the failing request can be retried or ignored without
    /// tearing down the session
    pub fn is_recoverable(&self) -> bool {
        match self {
            TsmfError::DuplicatePresentation { .. } => true,
            TsmfError::PresentationNotFound { .. } => true,
            TsmfError::DuplicateStream { .. } => true,
            TsmfError::StreamNotFound { .. } => true,
            TsmfError::InvalidState { .. } => true,
            TsmfError::InvalidConfiguration { .. } => false,
        }
    }
}
