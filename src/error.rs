// Error types module

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Classification of a failure, as reported in a run summary.
///
/// `Configuration` failures are fatal and abort a run before any file is
/// touched. The remaining kinds are recorded per file and never abort the
/// batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Configuration,
    Decode,
    Render,
    Write,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Decode => "decode",
            ErrorKind::Render => "render",
            ErrorKind::Write => "write",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while configuring or running a watermark batch.
#[derive(Debug, Error)]
pub enum WatermarkError {
    /// Invalid root directory, invalid or contradictory watermark settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source image could not be read or decoded
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// File extension names a known format but the content is something else
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Watermark could not be rendered onto the image
    #[error("Failed to render watermark: {0}")]
    Render(String),

    /// Destination could not be created or written
    #[error("Failed to write output: {0}")]
    Write(String),
}

impl WatermarkError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    pub fn render(message: impl Into<String>) -> Self {
        Self::Render(message.into())
    }

    pub fn write(message: impl Into<String>) -> Self {
        Self::Write(message.into())
    }

    /// Summary classification. A format mismatch counts as a decode failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::Decode(_) | Self::UnsupportedFormat(_) => ErrorKind::Decode,
            Self::Render(_) => ErrorKind::Render,
            Self::Write(_) => ErrorKind::Write,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}
