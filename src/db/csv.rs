use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Local};

use crate::db::{SampleLog, SampleLogError};
use crate::utils;

pub const CSV_HEADER: &str = "timestamp,sample";

/// Appends `timestamp,sample` rows to a file. Each row is flushed as it is written.
pub struct CsvSampleLog {
    writer: BufWriter<File>,
}

impl CsvSampleLog {
    /// Opens `path` for appending, writing the header only when the file is new or empty.
    pub fn open(path: &Path) -> Result<Self, SampleLogError> {
        let open_err = |source| SampleLogError::Open { path: path.to_path_buf(), source };
        utils::create_parent_folder(path).map_err(open_err)?;
        let is_new = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(open_err)?;
        let mut log = CsvSampleLog { writer: BufWriter::new(file) };
        if is_new {
            writeln!(log.writer, "{}", CSV_HEADER)?;
            log.writer.flush()?;
        }
        Ok(log)
    }
}

impl SampleLog for CsvSampleLog {
    fn append(&mut self, at: DateTime<Local>, value: f64) -> Result<(), SampleLogError> {
        writeln!(self.writer, "{},{}", utils::iso_timestamp(at), value)?;
        self.writer.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SampleLogError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("client_log.csv");
        let at = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        let mut log = CsvSampleLog::open(&path).unwrap();
        log.append(at, 0.25).unwrap();
        drop(log);

        let mut log = CsvSampleLog::open(&path).unwrap();
        log.append(at, 1.0).unwrap();
        log.flush().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with("2024-01-02T03:04:05"));
        assert!(lines[1].ends_with(",0.25"));
        assert!(lines[2].ends_with(",1"));
    }
}
