//! Error types for JPEG probing, decoding and encoding.

use thiserror::Error;

/// Errors returned from the public decode and encode entry points.
///
/// Backend diagnostics never appear here: whatever the codec backend reported
/// is logged and replaced with one of these messages.
#[derive(Debug, Error)]
pub enum JpegError {
    /// The decoder backend hit a fatal error or the stream ran out mid-image.
    #[error("JPEG loading error")]
    DecodeFailed,

    /// The named encoder backend hit a fatal error.
    #[error("Error saving JPEG with {backend}")]
    EncodeFailed { backend: &'static str },

    /// No backend for this direction was compiled in.
    #[error("JPEG {0} support is not available")]
    BackendUnavailable(&'static str),

    /// The output surface could not be allocated.
    #[error("Out of memory allocating {width}x{height} surface")]
    OutOfMemory { width: u32, height: u32 },

    /// The header declares dimensions above the configured decode limit.
    #[error("Image dimensions {width}x{height} exceed decode limits")]
    LimitExceeded { width: u32, height: u32 },

    /// The surface handed to the encoder is unusable.
    #[error("Invalid surface: {0}")]
    InvalidSurface(String),

    /// I/O error before any backend work started.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
