//! Error types for sizepress operations.

use thiserror::Error;

/// Result type alias for sizepress operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while searching for a size-fitting encoding.
///
/// A budget that cannot be met is *not* an error: `compress` reports it
/// through [`crate::CompressionResult::met_target`] instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Compression options failed validation; no encode was attempted.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// The requested format (or format/mode combination) is not implemented.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Input bytes could not be decoded.
    #[error("Decode failed ({codec}): {message}")]
    Decode {
        /// Codec or sniffer that rejected the input.
        codec: String,
        /// Error message from the decoder.
        message: String,
    },

    /// The underlying codec failed on a specific encode trial.
    #[error("Encode failed ({codec}): {message}")]
    Encode {
        /// Codec identifier.
        codec: String,
        /// Error message from the encoder.
        message: String,
    },
}
