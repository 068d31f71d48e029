use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use scrapedesk_logging::desk_info;
use tempfile::NamedTempFile;
use thiserror::Error;

/// File name used when the caller does not pick one.
pub const DEFAULT_RESULT_FILE: &str = "scrape_results.json";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Holds the downloadable result of the latest submission.
///
/// Each submission replaces the previous file; a reader never observes a
/// half-written result because the text lands in a temp file first and is
/// then renamed over the target.
#[derive(Debug, Clone)]
pub struct DownloadStore {
    target: PathBuf,
}

impl DownloadStore {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
        }
    }

    pub fn write(&self, contents: &str) -> Result<PathBuf, PersistError> {
        let dir = match self.target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        ensure_output_dir(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        tmp.persist(&self.target)
            .map_err(|e| PersistError::Io(e.error))?;
        desk_info!(
            "Wrote result file path={:?} bytes={}",
            self.target,
            contents.len()
        );
        Ok(self.target.clone())
    }
}
