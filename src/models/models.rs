use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const SELECT_CMD: &str = "select";

/// Client-side convenience list of selectable intervals; the server accepts any positive value.
pub const SUPPORTED_INTERVALS_MS: [u64; 7] = [10, 20, 50, 100, 200, 500, 1000];

/// A control record as it travels on the wire, one JSON object per line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlMessage {
    pub cmd: String,
    pub idx: usize,
    pub ms: f64,
}

/// A validated `select` request: which series to stream and how fast.
/// Only [`ControlCommand::select`] builds one, so the interval is always positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlCommand {
    series_index: usize,
    interval_ms: f64,
}

impl ControlCommand {
    /// Returns `None` unless `interval_ms` is finite and at least one nanosecond once rounded.
    pub fn select(series_index: usize, interval_ms: f64) -> Option<Self> {
        interval_nanos(interval_ms)?;
        Some(ControlCommand { series_index, interval_ms })
    }

    pub fn series_index(&self) -> usize {
        self.series_index
    }

    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    pub fn interval(&self) -> Duration {
        Duration::from_nanos(interval_nanos(self.interval_ms).unwrap_or(0))
    }
}

fn interval_nanos(interval_ms: f64) -> Option<u64> {
    if !interval_ms.is_finite() || interval_ms <= 0.0 {
        return None;
    }
    let nanos = (interval_ms * 1e6).round();
    if nanos < 1.0 || nanos >= u64::MAX as f64 {
        return None;
    }
    Some(nanos as u64)
}

impl From<ControlCommand> for ControlMessage {
    fn from(cmd: ControlCommand) -> Self {
        ControlMessage {
            cmd: SELECT_CMD.to_string(),
            idx: cmd.series_index(),
            ms: cmd.interval_ms(),
        }
    }
}
