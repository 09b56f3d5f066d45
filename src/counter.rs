//! Crash-recoverable visit counter
//!
//! The counter is a single non-negative integer persisted as UTF-8 text in a
//! file. On startup it is loaded from disk (creating the file and any parent
//! directories on first run, with a missing or empty file reading as 0); every
//! completed visit increments it and writes the new value back immediately, so
//! the count is reconstructible after a crash. A write failure is reported to
//! the caller, never swallowed.

use crate::CounterError;
use std::fs;
use std::path::{Path, PathBuf};

/// Durable count of completed crawl visits.
pub struct VisitCounter {
    path: PathBuf,
    count: u64,
}

impl VisitCounter {
    /// Loads the counter from `path`, initializing the backing file on the
    /// first-ever run.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CounterError> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|source| CounterError::Write {
                    path: path.display().to_string(),
                    source,
                })?;
            }
            fs::write(&path, "0").map_err(|source| CounterError::Write {
                path: path.display().to_string(),
                source,
            })?;
            return Ok(Self { path, count: 0 });
        }

        let raw = fs::read_to_string(&path).map_err(|source| CounterError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let trimmed = raw.trim();
        let count = if trimmed.is_empty() {
            0
        } else {
            trimmed.parse::<u64>().map_err(|_| CounterError::Corrupt {
                path: path.display().to_string(),
                value: trimmed.to_string(),
            })?
        };

        Ok(Self { path, count })
    }

    /// Current count of completed visits.
    pub fn value(&self) -> u64 {
        self.count
    }

    /// Increments the counter and persists the new value.
    pub fn increment(&mut self) -> Result<(), CounterError> {
        self.count += 1;
        fs::write(&self.path, self.count.to_string()).map_err(|source| CounterError::Write {
            path: self.path.display().to_string(),
            source,
        })
    }
}
