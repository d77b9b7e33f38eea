//! Compression result: what the search settled on and how it got there.

use serde::Serialize;

use crate::codec::CodecKind;

/// Outcome of one [`crate::compress`] call.
///
/// Always carries a usable encoding. When `met_target` is false the buffer
/// is the smallest encoding observed across every round, and `size_after`
/// may exceed the budget.
#[derive(Debug, Clone, Serialize)]
pub struct CompressionResult {
    /// Encoded bytes of the selected trial.
    #[serde(skip)]
    pub buffer: Vec<u8>,

    /// Format the buffer is encoded in.
    pub format: CodecKind,

    /// Whether `size_after <= target_bytes`.
    pub met_target: bool,

    /// Quality parameter of the selected trial.
    pub quality: u8,

    /// Dimensions of the selected trial, after any downscaling.
    pub final_width: u32,
    /// Dimensions of the selected trial, after any downscaling.
    pub final_height: u32,

    /// Size of the uncompressed input buffer in bytes.
    pub size_before: u64,

    /// Size of the selected encoding in bytes.
    pub size_after: u64,

    /// Encode calls spent across all rounds.
    pub trials: u32,

    /// Downscale rounds taken (0 when the original resolution sufficed).
    pub rounds: u32,
}

impl CompressionResult {
    /// Bytes saved relative to the uncompressed input. Zero when the
    /// encoding is larger than the raw buffer.
    #[must_use]
    pub fn savings(&self) -> u64 {
        self.size_before.saturating_sub(self.size_after)
    }

    /// Output size as a percentage of the uncompressed input.
    #[must_use]
    pub fn compression_ratio(&self) -> f64 {
        if self.size_before == 0 {
            return 0.0;
        }
        self.size_after as f64 / self.size_before as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CompressionResult {
        CompressionResult {
            buffer: vec![0u8; 512],
            format: CodecKind::Jpeg,
            met_target: true,
            quality: 80,
            final_width: 64,
            final_height: 48,
            size_before: 9216,
            size_after: 512,
            trials: 5,
            rounds: 0,
        }
    }

    #[test]
    fn test_savings_and_ratio() {
        let result = sample();
        assert_eq!(result.savings(), 8704);
        let ratio = result.compression_ratio();
        assert!((ratio - 5.555).abs() < 0.01, "ratio {ratio}");
    }

    #[test]
    fn test_savings_saturates_when_output_grows() {
        let mut result = sample();
        result.size_after = 20_000;
        assert_eq!(result.savings(), 0);
    }

    #[test]
    fn test_serialized_report_omits_buffer() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("buffer").is_none());
        assert_eq!(json["format"], "jpeg");
        assert_eq!(json["quality"], 80);
        assert_eq!(json["met_target"], true);
    }
}
