use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::store::SampleSeries;

pub const SERIES_EXTENSION: &str = "txt";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("series index {index} out of range ({available} series available)")]
    NotFound { index: usize, available: usize },
    #[error("failed to list series in {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("failed to read series {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The folder of pre-recorded series, addressed by zero-based index in file name order.
/// The folder is rescanned on every lookup so files added at runtime become selectable.
#[derive(Debug, Clone)]
pub struct SeriesCatalog {
    folder: PathBuf,
}

impl SeriesCatalog {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        SeriesCatalog { folder: folder.into() }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Lists the series files directly inside the folder, sorted by file name.
    pub fn entries(&self) -> Result<Vec<PathBuf>, StoreError> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(&self.folder)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|source| StoreError::Walk {
                path: self.folder.clone(),
                source,
            })?;
            let is_series = entry.file_type().is_file()
                && entry.path().extension().and_then(|s| s.to_str()) == Some(SERIES_EXTENSION);
            if is_series {
                entries.push(entry.into_path());
            }
        }
        Ok(entries)
    }

    pub fn load(&self, index: usize) -> Result<SampleSeries, StoreError> {
        let entries = self.entries()?;
        let path = entries.get(index).ok_or(StoreError::NotFound {
            index,
            available: entries.len(),
        })?;
        load_series(path)
    }
}

/// Reads one series file. Bytes that are not valid UTF-8 only spoil the lines they sit on.
pub fn load_series(path: &Path) -> Result<SampleSeries, StoreError> {
    let bytes = fs::read(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(SampleSeries::from_text(name, &String::from_utf8_lossy(&bytes)))
}
