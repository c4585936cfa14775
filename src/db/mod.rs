mod client;
pub use client::*;
mod csv;
pub use csv::*;

use std::path::Path;

/// Creates the sample log selected by `log_type` (`csv` or `none`).
pub fn new_sample_log(log_type: &str, path: &Path) -> Result<Box<dyn SampleLog>, SampleLogError> {
    match log_type {
        "csv" => Ok(Box::new(CsvSampleLog::open(path)?)),
        "none" => Ok(Box::new(NullSampleLog)),
        other => Err(SampleLogError::Unsupported(other.to_string())),
    }
}
