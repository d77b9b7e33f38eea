//! Compression options: the configuration surface consumed by [`crate::compress`].

use serde::{Deserialize, Serialize};

use crate::codec::CodecKind;
use crate::error::{Error, Result};

/// Options for one [`crate::compress`] call.
///
/// Immutable for the duration of the call. [`CompressionOptions::new`] gives
/// usable defaults; use [`CompressionOptions::builder`] to adjust fields.
/// Validation happens inside `compress`, before any encode is attempted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionOptions {
    /// Maximum allowed output size in bytes. Must be positive.
    pub target_bytes: u64,

    /// Output format.
    pub format: CodecKind,

    /// First quality the search probes (1–100).
    pub initial_quality: u8,

    /// Lowest quality the search may attempt (1–100, at most `initial_quality`).
    pub quality_floor: u8,

    /// Dimension multiplier applied per fallback round, strictly in (0, 1).
    pub scale_factor: f64,

    /// Downscaling never takes either dimension below this floor.
    pub min_dimension: u32,

    /// Maximum encode trials per quality search.
    pub max_trials: u32,

    /// Maximum number of downscale rounds (0 disables the fallback).
    pub max_rounds: u32,
}

impl CompressionOptions {
    /// Create options with the default search parameters.
    #[must_use]
    pub fn new(format: CodecKind, target_bytes: u64) -> Self {
        Self {
            target_bytes,
            format,
            initial_quality: 85,
            quality_floor: 1,
            scale_factor: 0.7,
            min_dimension: 16,
            max_trials: 12,
            max_rounds: 10,
        }
    }

    /// Create a builder seeded with the default search parameters.
    #[must_use]
    pub fn builder(format: CodecKind, target_bytes: u64) -> CompressionOptionsBuilder {
        CompressionOptionsBuilder {
            options: Self::new(format, target_bytes),
        }
    }

    /// Check every field; called by `compress` before the first encode.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.target_bytes == 0 {
            return Err(Error::InvalidOptions(
                "target_bytes must be positive".to_string(),
            ));
        }
        if !(self.scale_factor > 0.0 && self.scale_factor < 1.0) {
            return Err(Error::InvalidOptions(format!(
                "scale_factor must be strictly between 0 and 1, got {}",
                self.scale_factor
            )));
        }
        if self.initial_quality < 1 || self.initial_quality > 100 {
            return Err(Error::InvalidOptions(format!(
                "initial_quality must be in [1, 100], got {}",
                self.initial_quality
            )));
        }
        if self.quality_floor < 1 || self.quality_floor > self.initial_quality {
            return Err(Error::InvalidOptions(format!(
                "quality_floor must be in [1, initial_quality], got {}",
                self.quality_floor
            )));
        }
        if self.min_dimension == 0 {
            return Err(Error::InvalidOptions(
                "min_dimension must be at least 1".to_string(),
            ));
        }
        if self.max_trials == 0 {
            return Err(Error::InvalidOptions(
                "max_trials must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`CompressionOptions`].
#[derive(Debug, Clone)]
pub struct CompressionOptionsBuilder {
    options: CompressionOptions,
}

impl CompressionOptionsBuilder {
    /// Set the first quality the search probes.
    #[must_use]
    pub fn initial_quality(mut self, quality: u8) -> Self {
        self.options.initial_quality = quality;
        self
    }

    /// Set the lowest quality the search may attempt.
    #[must_use]
    pub fn quality_floor(mut self, quality: u8) -> Self {
        self.options.quality_floor = quality;
        self
    }

    /// Set the per-round downscale factor.
    #[must_use]
    pub fn scale_factor(mut self, factor: f64) -> Self {
        self.options.scale_factor = factor;
        self
    }

    /// Set the dimension floor for downscaling.
    #[must_use]
    pub fn min_dimension(mut self, pixels: u32) -> Self {
        self.options.min_dimension = pixels;
        self
    }

    /// Set the encode-trial budget per quality search.
    #[must_use]
    pub fn max_trials(mut self, trials: u32) -> Self {
        self.options.max_trials = trials;
        self
    }

    /// Set the maximum number of downscale rounds.
    #[must_use]
    pub fn max_rounds(mut self, rounds: u32) -> Self {
        self.options.max_rounds = rounds;
        self
    }

    /// Build the options. Validation is deferred to `compress`.
    #[must_use]
    pub fn build(self) -> CompressionOptions {
        self.options
    }
}
