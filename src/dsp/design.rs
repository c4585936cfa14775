use serde::Serialize;

pub const MIN_ORDER: usize = 5;
pub const MAX_ORDER: usize = 200;
pub const DEFAULT_ORDER: usize = 20;
pub const MIN_CUTOFF: f64 = 1e-3;
pub const MAX_CUTOFF: f64 = 1.0 - 1e-3;
/// Cutoff used when no dominant frequency is known. Matches what the regular
/// branch yields for a zero estimate after clamping.
pub const DEFAULT_CUTOFF: f64 = MIN_CUTOFF;
/// Tap count is roughly this many periods of the normalized cutoff.
const ORDER_NUMERATOR: f64 = 4.0;

/// A low-pass FIR design: tap count and cutoff as a fraction of Nyquist.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FilterSpec {
    pub order: usize,
    pub cutoff: f64,
}

impl Default for FilterSpec {
    fn default() -> Self {
        FilterSpec { order: DEFAULT_ORDER, cutoff: DEFAULT_CUTOFF }
    }
}

/// Derives a filter design from a dominant-frequency estimate.
///
/// Lower frequencies relative to Nyquist need more taps for the same relative
/// transition width. Both outputs are clamped so the design never degenerates.
pub fn design(dominant_hz: f64, sample_rate_hz: f64) -> FilterSpec {
    if !(dominant_hz > 0.0) || !(sample_rate_hz > 0.0) {
        return FilterSpec::default();
    }
    let nyquist = sample_rate_hz / 2.0;
    let normalized = dominant_hz / nyquist;
    let order = (ORDER_NUMERATOR / normalized.max(MIN_CUTOFF))
        .round()
        .clamp(MIN_ORDER as f64, MAX_ORDER as f64) as usize;
    FilterSpec {
        order,
        cutoff: normalized.clamp(MIN_CUTOFF, MAX_CUTOFF),
    }
}
