use std::time::Duration;

use serde::Serialize;

use crate::dsp::{design, EmaSmoother, FilterSpec, FirEngine, SpectralEstimator, DEFAULT_ALPHA, SPECTRAL_WINDOW};

/// Number of most recent samples carried in a snapshot.
pub const SNAPSHOT_TAIL: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    pub alpha: f64,
    /// Keep at most this many samples; `None` keeps everything. Once trimming
    /// starts, the oldest kept FIR outputs still include the dropped samples.
    pub history_capacity: Option<usize>,
    /// Largest cutoff change that still reuses the applied FIR design.
    pub redesign_tolerance: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            alpha: DEFAULT_ALPHA,
            history_capacity: None,
            redesign_tolerance: 0.0,
        }
    }
}

/// Immutable view of the pipeline handed to consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub raw: Vec<f64>,
    pub filtered: Vec<f64>,
    pub ema: Vec<f64>,
    pub spec: Option<FilterSpec>,
    pub dominant_hz: f64,
    pub interval_ms: Option<f64>,
    pub samples_seen: u64,
}

impl Snapshot {
    /// Renders the snapshot as one JSON object for consumers outside the process.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Result of feeding one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub ema: f64,
    /// Present when the FIR path ran, i.e. a sampling interval is known.
    pub fir: Option<FirStep>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirStep {
    pub dominant_hz: f64,
    pub spec: FilterSpec,
    pub output: f64,
}

/// Client-side filtering state: raw history, FIR and EMA outputs.
///
/// The ingest loop is the only writer. Once the FIR path has run, raw,
/// filtered and EMA series always have the same length.
pub struct Pipeline {
    config: PipelineConfig,
    raw: Vec<f64>,
    ema: Vec<f64>,
    smoother: EmaSmoother,
    estimator: SpectralEstimator,
    engine: FirEngine,
    interval: Option<Duration>,
    dominant_hz: f64,
    samples_seen: u64,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Pipeline {
            config,
            raw: Vec::new(),
            ema: Vec::new(),
            smoother: EmaSmoother::new(config.alpha),
            estimator: SpectralEstimator::new(SPECTRAL_WINDOW),
            engine: FirEngine::new(config.redesign_tolerance),
            interval: None,
            dominant_hz: 0.0,
            samples_seen: 0,
        }
    }

    /// Sets the sampling interval the FIR path designs against.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = (!interval.is_zero()).then_some(interval);
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Feeds one decoded sample through the EMA and, when an interval is
    /// known, through spectral estimation, filter design and the FIR engine.
    pub fn push(&mut self, value: f64) -> Step {
        self.samples_seen += 1;
        self.raw.push(value);
        let ema = self.smoother.push(value);
        self.ema.push(ema);
        self.trim();

        let fir = self.interval.map(|interval| {
            self.dominant_hz = self.estimator.dominant_frequency(&self.raw, interval);
            let sample_rate = 1.0 / interval.as_secs_f64();
            let spec = self.engine.apply(design(self.dominant_hz, sample_rate), &self.raw);
            FirStep {
                dominant_hz: self.dominant_hz,
                spec,
                output: self.engine.filtered().last().copied().unwrap_or(0.0),
            }
        });
        Step { ema, fir }
    }

    fn trim(&mut self) {
        let Some(capacity) = self.config.history_capacity else {
            return;
        };
        let excess = self.raw.len().saturating_sub(capacity.max(1));
        if excess > 0 {
            self.raw.drain(..excess);
            self.ema.drain(..excess);
            self.engine.discard_front(excess);
        }
    }

    pub fn raw(&self) -> &[f64] {
        &self.raw
    }

    pub fn filtered(&self) -> &[f64] {
        self.engine.filtered()
    }

    pub fn ema(&self) -> &[f64] {
        &self.ema
    }

    pub fn spec(&self) -> Option<FilterSpec> {
        self.engine.applied()
    }

    pub fn dominant_hz(&self) -> f64 {
        self.dominant_hz
    }

    pub fn samples_seen(&self) -> u64 {
        self.samples_seen
    }

    /// How many times FIR coefficients have been synthesized so far.
    pub fn redesigns(&self) -> u64 {
        self.engine.redesigns()
    }

    /// Copies the last `tail` samples of each series.
    pub fn snapshot(&self, tail: usize) -> Snapshot {
        fn last(values: &[f64], tail: usize) -> Vec<f64> {
            values[values.len().saturating_sub(tail)..].to_vec()
        }
        Snapshot {
            raw: last(&self.raw, tail),
            filtered: last(self.engine.filtered(), tail),
            ema: last(&self.ema, tail),
            spec: self.spec(),
            dominant_hz: self.dominant_hz,
            interval_ms: self.interval.map(|i| i.as_secs_f64() * 1000.0),
            samples_seen: self.samples_seen,
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Pipeline::new(PipelineConfig::default())
    }
}
