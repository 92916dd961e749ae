//! # TSMF Core
//!
//! Shared building blocks for the TSMF media container: presentation and
//! stream identifiers, output geometry, playback configuration and the core
//! error type used across the workspace.

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod geometry;
pub mod ids;

pub use config::PlaybackConfig;
pub use error::{TsmfError, TsmfResult};
pub use geometry::Rect;
pub use ids::{PresentationId, StreamId};
