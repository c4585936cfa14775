use std::time::Duration;

use num_complex::Complex;
use rustfft::FftPlanner;

/// Upper bound on the number of trailing samples analysed per estimate.
pub const SPECTRAL_WINDOW: usize = 200;

/// Estimates the dominant frequency of the most recent samples.
///
/// Every call recomputes the transform from scratch over the trailing window;
/// plans are cached by the planner so repeated window sizes are cheap.
pub struct SpectralEstimator {
    planner: FftPlanner<f64>,
    window_cap: usize,
    buffer: Vec<Complex<f64>>,
}

impl SpectralEstimator {
    pub fn new(window_cap: usize) -> Self {
        SpectralEstimator {
            planner: FftPlanner::new(),
            window_cap: window_cap.max(1),
            buffer: Vec::with_capacity(window_cap),
        }
    }

    /// Window size used for a history of `history_len` samples.
    pub fn window_len(&self, history_len: usize) -> usize {
        history_len.min(self.window_cap)
    }

    /// Index of the largest-magnitude bin of the one-sided spectrum of the
    /// mean-removed trailing window, with the window size. `None` for no samples.
    /// Ties resolve to the lowest bin.
    pub fn dominant_bin(&mut self, history: &[f64]) -> Option<(usize, usize)> {
        let m = self.window_len(history.len());
        if m == 0 {
            return None;
        }
        let window = &history[history.len() - m..];
        let mean = window.iter().sum::<f64>() / m as f64;

        self.buffer.clear();
        self.buffer.extend(window.iter().map(|&v| Complex::new(v - mean, 0.0)));
        let fft = self.planner.plan_fft_forward(m);
        fft.process(&mut self.buffer);

        let mut best = (0, f64::NEG_INFINITY);
        for (bin, value) in self.buffer[..=m / 2].iter().enumerate() {
            let magnitude = value.norm();
            if magnitude > best.1 {
                best = (bin, magnitude);
            }
        }
        Some((best.0, m))
    }

    /// Dominant frequency in Hz for samples spaced `interval` apart; 0 when there is nothing to analyse.
    pub fn dominant_frequency(&mut self, history: &[f64], interval: Duration) -> f64 {
        let dt = interval.as_secs_f64();
        if dt <= 0.0 {
            return 0.0;
        }
        match self.dominant_bin(history) {
            Some((bin, m)) => bin as f64 / (m as f64 * dt),
            None => 0.0,
        }
    }
}

impl Default for SpectralEstimator {
    fn default() -> Self {
        SpectralEstimator::new(SPECTRAL_WINDOW)
    }
}
