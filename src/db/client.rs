use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SampleLogError {
    #[error("failed to open sample log {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write sample log: {0}")]
    Write(#[from] io::Error),
    #[error("unsupported sample log type: {0}")]
    Unsupported(String),
}

/// Append-only sink for accepted samples, one record per sample.
pub trait SampleLog: Send {
    fn append(&mut self, at: DateTime<Local>, value: f64) -> Result<(), SampleLogError>;
    fn flush(&mut self) -> Result<(), SampleLogError>;
}

/// Discards everything.
pub struct NullSampleLog;

impl SampleLog for NullSampleLog {
    fn append(&mut self, _at: DateTime<Local>, _value: f64) -> Result<(), SampleLogError> {
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SampleLogError> {
        Ok(())
    }
}
