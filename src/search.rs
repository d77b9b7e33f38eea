//! Quality search: find the highest quality whose encoding fits the budget.
//!
//! The search bisects the integer quality range, seeded at the caller's
//! initial quality. Lossy encoders occasionally emit a *larger* file at a
//! *lower* quality, so the bisection bounds are treated as a direction
//! heuristic only: the best-fit record and the smallest-trial record are
//! kept in a ledger indexed by quality, independent of search position, and
//! an isolated inversion cannot discard a fit that was already observed.
//!
//! The search operates on an encode callback rather than a concrete codec,
//! so tests can drive it with a mock size function.

use std::collections::BTreeMap;

use crate::codec::QualityScale;
use crate::error::Result;

/// One encode attempt retained by the search.
///
/// Trials are ephemeral: the search keeps only the best fit and the
/// smallest encoding, and discards the rest as soon as they are measured.
#[derive(Debug, Clone)]
pub struct EncodeTrial {
    /// Quality parameter the buffer was encoded at.
    pub quality: u8,
    /// The encoded bytes.
    pub buffer: Vec<u8>,
}

impl EncodeTrial {
    /// Encoded size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.buffer.len() as u64
    }
}

/// Outcome of one quality search at a fixed resolution.
#[derive(Debug)]
pub struct SearchOutcome {
    /// Highest-quality trial whose size fit the budget, if any fit at all.
    pub best_fit: Option<EncodeTrial>,
    /// Smallest trial observed, retained as the fallback candidate when
    /// nothing fits.
    pub smallest: EncodeTrial,
    /// Encode calls spent.
    pub trials_used: u32,
}

impl SearchOutcome {
    /// Whether any trial met the budget.
    #[must_use]
    pub fn fits(&self) -> bool {
        self.best_fit.is_some()
    }
}

/// Find the highest quality in `[quality_floor, 100]` whose encoding is at
/// most `target_bytes`, spending at most `max_trials` encode calls.
///
/// `scale` snaps probes onto the codec's distinct settings so stepped
/// scales (PNG effort, GIF palette) never re-encode an equivalent quality.
/// Among fitting trials the highest quality wins; at equal quality the
/// buffer already computed is kept, never re-encoded.
///
/// An encode error aborts the search immediately; a budget no trial can
/// meet is reported through `SearchOutcome::best_fit == None`, with the
/// smallest observed trial retained.
pub fn find_best_quality<F>(
    mut encode: F,
    scale: &QualityScale,
    target_bytes: u64,
    initial_quality: u8,
    quality_floor: u8,
    max_trials: u32,
) -> Result<SearchOutcome>
where
    F: FnMut(u8) -> Result<Vec<u8>>,
{
    let floor = quality_floor.clamp(1, 100);
    let mut lo = floor;
    let mut hi = 100u8;
    let mut probe = initial_quality.clamp(lo, hi);

    // Trial ledger: size per attempted quality. Doubles as the duplicate
    // guard and as the record the bisection bounds cannot invalidate.
    let mut ledger: BTreeMap<u8, u64> = BTreeMap::new();
    let mut best_fit: Option<EncodeTrial> = None;
    let mut smallest: Option<EncodeTrial> = None;
    let mut trials_used = 0u32;

    while trials_used < max_trials {
        let quality = scale.snap(probe).clamp(floor, 100);
        if ledger.contains_key(&quality) {
            // No untried setting remains in this direction; another probe
            // would only re-accept the current best fit (stagnation).
            break;
        }

        let buffer = encode(quality)?;
        trials_used += 1;
        let size = buffer.len() as u64;
        ledger.insert(quality, size);
        let trial = EncodeTrial { quality, buffer };

        if smallest.as_ref().map_or(true, |s| size < s.size()) {
            smallest = Some(trial.clone());
        }

        if size <= target_bytes {
            // The best-fit record lives outside the bisection bounds, so an
            // encoder inversion below cannot make us lose this fit.
            if best_fit.as_ref().map_or(true, |b| quality >= b.quality) {
                best_fit = Some(trial);
            }
            if quality == 100 {
                break;
            }
            // Probe upward between the accepted quality and the ceiling.
            lo = quality + 1;
            if lo > hi {
                break;
            }
        } else {
            if quality <= lo {
                // Nothing left at or below the floor of the interval.
                break;
            }
            hi = quality - 1;
        }
        probe = midpoint(lo, hi);
    }

    let smallest = smallest.expect("max_trials >= 1 guarantees one trial");
    Ok(SearchOutcome {
        best_fit,
        smallest,
        trials_used,
    })
}

fn midpoint(lo: u8, hi: u8) -> u8 {
    lo + (hi - lo) / 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecKind;

    const LOSSY: QualityScale = QualityScale::Lossy { min: 1, max: 100 };

    /// Mock codec: encoded size is a pure function of quality.
    fn mock(f: impl Fn(u8) -> u64) -> impl FnMut(u8) -> Result<Vec<u8>> {
        move |q| Ok(vec![0u8; f(q) as usize])
    }

    #[test]
    fn test_initial_quality_100_fits_in_one_trial() {
        let outcome =
            find_best_quality(mock(|q| u64::from(q) * 100), &LOSSY, 1_000_000, 100, 1, 10)
                .unwrap();
        assert_eq!(outcome.trials_used, 1);
        assert_eq!(outcome.best_fit.unwrap().quality, 100);
    }

    #[test]
    fn test_converges_to_quality_80_within_7_trials() {
        // 250 bytes per quality step: quality 80 encodes to exactly 20,000
        // bytes against a 20 KiB (20,480) budget.
        let outcome =
            find_best_quality(mock(|q| u64::from(q) * 250), &LOSSY, 20 * 1024, 85, 1, 7).unwrap();
        let best = outcome.best_fit.unwrap();
        assert!(best.quality >= 80, "converged to {}", best.quality);
        assert!(best.size() <= 20 * 1024);
        assert!(outcome.trials_used <= 7);
    }

    #[test]
    fn test_monotonicity_inversion_does_not_lose_the_fit() {
        // Injected inversion around quality 51; only 50 and 51 fit a
        // 1000-byte budget, and 51 is the better of the two.
        let sizes = |q: u8| -> u64 {
            match q {
                50 => 1000,
                51 => 900,
                52 => 1100,
                q => u64::from(q) * 20,
            }
        };
        let outcome = find_best_quality(mock(sizes), &LOSSY, 1000, 50, 1, 12).unwrap();
        let best = outcome.best_fit.unwrap();
        assert_eq!(best.quality, 51);
        assert_eq!(best.size(), 900);
    }

    #[test]
    fn test_unreachable_budget_reports_smallest() {
        let outcome =
            find_best_quality(mock(|q| 500 + u64::from(q) * 10), &LOSSY, 400, 85, 1, 12).unwrap();
        assert!(!outcome.fits());
        assert_eq!(outcome.smallest.quality, 1);
        assert_eq!(outcome.smallest.size(), 510);
    }

    #[test]
    fn test_trial_budget_is_respected() {
        let outcome =
            find_best_quality(mock(|q| 10_000 + u64::from(q)), &LOSSY, 100, 85, 1, 3).unwrap();
        assert_eq!(outcome.trials_used, 3);
        assert!(!outcome.fits());
    }

    #[test]
    fn test_effort_scale_never_reencodes_a_level() {
        // PNG-style stepped scale: only three distinct settings exist.
        let scale = CodecKind::Png.scale();
        let sizes = |q: u8| -> u64 {
            match q {
                95 => 3000,
                60 => 3500,
                _ => 4000,
            }
        };

        // Best effort fits: accepted on the first trial, then the upward
        // probe snaps back onto 95 and the search stops.
        let outcome = find_best_quality(mock(sizes), &scale, 3200, 85, 1, 12).unwrap();
        assert_eq!(outcome.trials_used, 1);
        assert_eq!(outcome.best_fit.unwrap().quality, 95);

        // Nothing fits: each effort level is encoded exactly once.
        let outcome = find_best_quality(mock(sizes), &scale, 2900, 85, 1, 12).unwrap();
        assert_eq!(outcome.trials_used, 3);
        assert!(!outcome.fits());
        assert_eq!(outcome.smallest.size(), 3000);
    }

    #[test]
    fn test_encode_error_aborts() {
        let result = find_best_quality(
            |_q| {
                Err(crate::error::Error::Encode {
                    codec: "mock".to_string(),
                    message: "boom".to_string(),
                })
            },
            &LOSSY,
            1000,
            85,
            1,
            12,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_fit_invariants_over_fuzzed_size_functions() {
        // Deterministic xorshift fuzzing of jagged (non-monotone) size
        // functions: whenever a best fit is reported it must satisfy the
        // budget, and the smallest record must match the smallest size the
        // mock actually returned.
        let mut state = 0x2545_F491u32;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state
        };

        for _ in 0..50 {
            let base = u64::from(next() % 5000) + 100;
            let jitter = u64::from(next() % 400);
            let sizes = move |q: u8| base + u64::from(q) * 30 + (u64::from(q) * jitter) % 157;
            let target = u64::from(next() % 8000) + 50;
            let initial = (next() % 100 + 1) as u8;

            let mut observed: Vec<u64> = Vec::new();
            let outcome = find_best_quality(
                |q| {
                    let s = sizes(q);
                    observed.push(s);
                    Ok(vec![0u8; s as usize])
                },
                &LOSSY,
                target,
                initial,
                1,
                10,
            )
            .unwrap();

            if let Some(best) = &outcome.best_fit {
                assert!(best.size() <= target);
            }
            assert_eq!(
                outcome.smallest.size(),
                observed.iter().copied().min().unwrap()
            );
            assert_eq!(outcome.trials_used as usize, observed.len());
        }
    }
}
