//! Orchestrator: quality search first, resolution fallback when it fails.
//!
//! Each round runs a full quality search at the current resolution. Only
//! when no quality fits does the image shrink by `scale_factor` and the
//! search start over. The first fitting trial at the highest surviving
//! resolution wins; if every round fails, the smallest encoding observed
//! anywhere is returned with `met_target == false`.

use crate::codec;
use crate::error::Result;
use crate::image::{scaled_dimension, DecodedImage};
use crate::options::CompressionOptions;
use crate::report::CompressionResult;
use crate::search::{find_best_quality, EncodeTrial};

/// Search for an encoding of `image` that fits `options.target_bytes`.
///
/// The input is borrowed and never modified; downscaled rounds work on
/// internal copies. Errors abort immediately: an unmet budget is not an
/// error and is reported through [`CompressionResult::met_target`].
///
/// Search decisions are deterministic for a given input and options, but
/// encoded byte sizes depend on the codec libraries and may shift across
/// their versions.
pub fn compress(image: &DecodedImage, options: &CompressionOptions) -> Result<CompressionResult> {
    options.validate()?;

    let scale = options.format.scale();
    let size_before = image.raw_size();

    let mut shrunk: Option<DecodedImage> = None;
    let mut smallest: Option<(EncodeTrial, u32, u32)> = None;
    let mut trials = 0u32;
    let mut rounds = 0u32;

    loop {
        let current = shrunk.as_ref().unwrap_or(image);
        let (width, height) = (current.width(), current.height());

        let outcome = find_best_quality(
            |quality| codec::encode(current, options.format, quality),
            &scale,
            options.target_bytes,
            options.initial_quality,
            options.quality_floor,
            options.max_trials,
        )?;
        trials += outcome.trials_used;

        if let Some(best) = outcome.best_fit {
            let size_after = best.size();
            return Ok(CompressionResult {
                buffer: best.buffer,
                format: options.format,
                met_target: true,
                quality: best.quality,
                final_width: width,
                final_height: height,
                size_before,
                size_after,
                trials,
                rounds,
            });
        }

        if smallest
            .as_ref()
            .map_or(true, |(t, _, _)| outcome.smallest.size() < t.size())
        {
            smallest = Some((outcome.smallest, width, height));
        }

        if rounds >= options.max_rounds {
            break;
        }
        let next_width = scaled_dimension(width, options.scale_factor);
        let next_height = scaled_dimension(height, options.scale_factor);
        if next_width < options.min_dimension
            || next_height < options.min_dimension
            || (next_width == width && next_height == height)
        {
            break;
        }
        let next = current.downscale(options.scale_factor);
        shrunk = Some(next);
        rounds += 1;
    }

    let (trial, width, height) = smallest.expect("every round records a smallest trial");
    let size_after = trial.size();
    Ok(CompressionResult {
        buffer: trial.buffer,
        format: options.format,
        met_target: false,
        quality: trial.quality,
        final_width: width,
        final_height: height,
        size_before,
        size_after,
        trials,
        rounds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecKind;
    use crate::image::ColorMode;

    fn flat_gray(width: u32, height: u32) -> DecodedImage {
        let pixels = vec![128u8; width as usize * height as usize];
        DecodedImage::from_raw(pixels, width, height, ColorMode::Gray8).unwrap()
    }

    #[test]
    fn test_invalid_options_fail_before_any_encode() {
        let image = flat_gray(8, 8);
        let options = CompressionOptions::new(CodecKind::Jpeg, 0);
        assert!(compress(&image, &options).is_err());
    }

    #[test]
    fn test_generous_budget_keeps_full_resolution() {
        let image = flat_gray(32, 32);
        let options = CompressionOptions::new(CodecKind::Jpeg, 100 * 1024);
        let result = compress(&image, &options).unwrap();
        assert!(result.met_target);
        assert_eq!((result.final_width, result.final_height), (32, 32));
        assert_eq!(result.rounds, 0);
        assert_eq!(result.size_after, result.buffer.len() as u64);
        assert!(result.size_after <= 100 * 1024);
    }

    #[test]
    fn test_impossible_budget_reports_smallest_encoding() {
        // 16x16 at min_dimension 16: no fallback round is even possible,
        // and a 1-byte budget cannot be met by any encoder.
        let image = flat_gray(16, 16);
        let options = CompressionOptions::new(CodecKind::Jpeg, 1);
        let result = compress(&image, &options).unwrap();
        assert!(!result.met_target);
        assert_eq!(result.rounds, 0);
        assert!(result.size_after > 1);
        assert!(!result.buffer.is_empty());
    }

    #[test]
    fn test_fallback_disabled_by_zero_rounds() {
        let image = flat_gray(64, 64);
        let options = CompressionOptions::builder(CodecKind::Jpeg, 1)
            .max_rounds(0)
            .build();
        let result = compress(&image, &options).unwrap();
        assert_eq!(result.rounds, 0);
        assert_eq!((result.final_width, result.final_height), (64, 64));
    }

    #[test]
    fn test_trial_accounting_spans_rounds() {
        let image = flat_gray(64, 64);
        let options = CompressionOptions::builder(CodecKind::Jpeg, 1)
            .max_trials(2)
            .max_rounds(2)
            .min_dimension(16)
            .build();
        let result = compress(&image, &options).unwrap();
        assert!(!result.met_target);
        assert_eq!(result.rounds, 2);
        // Two trials per round, three rounds searched (original + 2 shrunk).
        assert!(result.trials <= 6);
        assert!(result.trials >= 3);
    }
}
