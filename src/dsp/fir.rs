use std::f64::consts::PI;

use crate::dsp::FilterSpec;

/// Symmetric Hamming window of `len` points.
pub fn hamming_window(len: usize) -> Vec<f64> {
    if len == 1 {
        return vec![1.0];
    }
    (0..len)
        .map(|i| 0.54 - 0.46 * ((2.0 * PI * i as f64) / ((len - 1) as f64)).cos())
        .collect()
}

fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

/// Windowed-sinc low-pass taps. `cutoff` is a fraction of Nyquist in (0, 1).
/// Taps are scaled for unit gain at DC.
pub fn lowpass_taps(spec: FilterSpec) -> Vec<f64> {
    let taps = spec.order.max(1);
    let center = (taps - 1) as f64 / 2.0;
    let window = hamming_window(taps);
    let mut coefficients: Vec<f64> = window
        .iter()
        .enumerate()
        .map(|(i, w)| spec.cutoff * sinc(spec.cutoff * (i as f64 - center)) * w)
        .collect();
    let gain: f64 = coefficients.iter().sum();
    if gain != 0.0 {
        coefficients.iter_mut().for_each(|c| *c /= gain);
    }
    coefficients
}

/// Output `n` of the causal convolution of `history` with `coefficients`,
/// assuming zero input before the start of `history`.
fn filter_at(coefficients: &[f64], history: &[f64], n: usize) -> f64 {
    coefficients
        .iter()
        .zip(history[..=n].iter().rev())
        .map(|(b, x)| b * x)
        .sum()
}

/// Applies the latest design to the retained history.
///
/// The whole history is refiltered only when the design changes; while the
/// applied design still matches (same order, cutoff within `tolerance`), only
/// samples that arrived since the last call are filtered. With a tolerance of
/// zero and an untrimmed history the result is identical to refiltering
/// everything on every sample.
///
/// After [`FirEngine::discard_front`] the kept outputs still reflect the
/// samples that were dropped, while a redesign refilters the trimmed history
/// as if nothing preceded it. The two only agree from the tap count onwards.
#[derive(Debug, Clone, Default)]
pub struct FirEngine {
    tolerance: f64,
    applied: Option<FilterSpec>,
    coefficients: Vec<f64>,
    filtered: Vec<f64>,
    redesigns: u64,
}

impl FirEngine {
    pub fn new(tolerance: f64) -> Self {
        FirEngine {
            tolerance: if tolerance.is_finite() { tolerance.max(0.0) } else { 0.0 },
            ..FirEngine::default()
        }
    }

    /// Brings the filtered output up to date with `history` and returns the design in force.
    pub fn apply(&mut self, spec: FilterSpec, history: &[f64]) -> FilterSpec {
        if !self.keeps(spec) {
            self.coefficients = lowpass_taps(spec);
            self.applied = Some(spec);
            self.filtered.clear();
            self.redesigns += 1;
        }
        self.filtered.truncate(history.len());
        for n in self.filtered.len()..history.len() {
            self.filtered.push(filter_at(&self.coefficients, history, n));
        }
        self.applied.unwrap_or(spec)
    }

    fn keeps(&self, spec: FilterSpec) -> bool {
        match self.applied {
            Some(applied) => {
                applied.order == spec.order && (applied.cutoff - spec.cutoff).abs() <= self.tolerance
            }
            None => false,
        }
    }

    /// Drops the oldest `count` outputs, mirroring a trim of the input history.
    pub fn discard_front(&mut self, count: usize) {
        let count = count.min(self.filtered.len());
        self.filtered.drain(..count);
    }

    pub fn filtered(&self) -> &[f64] {
        &self.filtered
    }

    pub fn applied(&self) -> Option<FilterSpec> {
        self.applied
    }

    /// Number of times the coefficients were resynthesized.
    pub fn redesigns(&self) -> u64 {
        self.redesigns
    }
}
