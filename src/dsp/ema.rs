pub const DEFAULT_ALPHA: f64 = 0.1;

/// Exponential moving average: `y[0] = x[0]`, `y[i] = α·x[i] + (1-α)·y[i-1]`.
#[derive(Debug, Clone)]
pub struct EmaSmoother {
    alpha: f64, // Smoothing factor
    y_prev: Option<f64>, // Previous output value
}

impl EmaSmoother {
    /// Creates a smoother; `alpha` is clamped into (0, 1].
    pub fn new(alpha: f64) -> Self {
        let alpha = if alpha.is_finite() { alpha.clamp(f64::EPSILON, 1.0) } else { DEFAULT_ALPHA };
        EmaSmoother { alpha, y_prev: None }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Feeds one sample and returns the new average.
    pub fn push(&mut self, x: f64) -> f64 {
        let y = match self.y_prev {
            None => x,
            Some(prev) => self.alpha * x + (1.0 - self.alpha) * prev,
        };
        self.y_prev = Some(y);
        y
    }
}

impl Default for EmaSmoother {
    fn default() -> Self {
        EmaSmoother::new(DEFAULT_ALPHA)
    }
}
