//! # sizepress
//!
//! Size-targeted image compression: given a decoded image and a byte
//! budget, find the encoding parameters that fit.
//!
//! The search bisects the codec's quality range first, then falls back to
//! shrinking the resolution when no quality fits. The result always carries
//! a usable encoding; whether the budget was met is reported, not raised.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sizepress::{codec, compress, CodecKind, CompressionOptions};
//!
//! let image = codec::decode(&input_bytes)?;
//!
//! let options = CompressionOptions::builder(CodecKind::Jpeg, 100 * 1024)
//!     .initial_quality(85)
//!     .build();
//!
//! let result = compress(&image, &options)?;
//! if result.met_target {
//!     std::fs::write("out.jpg", &result.buffer)?;
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`]: Error types for the library
//! - [`image`]: Decoded image buffer and downscaling
//! - [`codec`]: Per-format encode/decode adapters and quality scales
//! - [`options`]: Compression options and builder
//! - [`search`]: Quality search over a single resolution
//! - [`compress`]: Orchestrator with resolution fallback
//! - [`report`]: Compression result and statistics

pub mod codec;
pub mod compress;
pub mod error;
pub mod image;
pub mod options;
pub mod report;
pub mod search;

// Re-export commonly used types
pub use codec::{CodecKind, QualityScale};
pub use compress::compress;
pub use error::{Error, Result};
pub use crate::image::{ColorMode, DecodedImage};
pub use options::{CompressionOptions, CompressionOptionsBuilder};
pub use report::CompressionResult;
pub use search::{find_best_quality, EncodeTrial, SearchOutcome};
