//! Layered error definitions
//!
//! Categorized by source: config / frame / source / sink

use thiserror::Error;

use crate::{FrameId, SpaceId};

/// Error of a single frame read. Never aborts a query: the frame is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Frame could not be decoded
    #[error("malformed frame {frame} in {space}: {message}")]
    Malformed {
        space: SpaceId,
        frame: FrameId,
        message: String,
    },

    /// Segment ended in the middle of a frame
    #[error("truncated segment '{segment}' after {frame}")]
    Truncated { segment: String, frame: FrameId },
}

impl FrameError {
    pub fn malformed(space: SpaceId, frame: FrameId, message: impl Into<String>) -> Self {
        Self::Malformed {
            space,
            frame,
            message: message.into(),
        }
    }
}

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Data Errors =====
    /// Frame read error
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Unparsable time literal
    #[error("invalid time '{input}': {message}")]
    InvalidTime { input: String, message: String },

    /// No source registered for a space
    #[error("no frame source for {space}")]
    SourceUnavailable { space: SpaceId },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_time(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidTime {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}
