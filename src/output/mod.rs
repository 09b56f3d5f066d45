//! Record type and persistence sinks
//!
//! A [`Record`] is the structured output of processing one URL. It is seeded
//! with the URL and a capture timestamp, filled in by the rule's processors,
//! and handed to the rule's [`RecordSink`] if any processor produced output.
//! Sinks are fire-and-forget from the crawl engine's perspective; their errors
//! are logged, not retried.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

/// Delimiter joining repeated `save` matches into one record field.
pub const VALUE_DELIMITER: &str = ",#!#~, ";

/// Errors that can occur while persisting records
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to open record sink {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to write record: {0}")]
    Write(#[from] std::io::Error),

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Structured output of one visited URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// The visited URL
    pub url: String,

    /// Capture timestamp (RFC 3339)
    pub date: String,

    /// Fields produced by the rule's processors, in field-name order
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

impl Record {
    /// Creates a record seeded with the URL and the current timestamp.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            date: chrono::Utc::now().to_rfc3339(),
            fields: BTreeMap::new(),
        }
    }

    /// Appends `value` to `field`, joining repeats with [`VALUE_DELIMITER`]
    /// so multiple matches accumulate rather than overwrite.
    pub fn append(&mut self, field: &str, value: &str) {
        self.fields
            .entry(field.to_string())
            .and_modify(|existing| {
                existing.push_str(VALUE_DELIMITER);
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    /// Sets `field` to `value`, replacing any previous content.
    pub fn set(&mut self, field: &str, value: &str) {
        self.fields.insert(field.to_string(), value.to_string());
    }

    /// True when no processor produced output beyond the seeded url/date.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Persistence sink consuming finished records, one per rule.
pub trait RecordSink: Send + Sync {
    fn save(&self, record: &Record) -> Result<(), SinkError>;
}

/// Sink appending one JSON object per line to a file.
pub struct JsonlSink {
    writer: Mutex<BufWriter<File>>,
}

impl JsonlSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| SinkError::Open {
                path: path.display().to_string(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| SinkError::Open {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl RecordSink for JsonlSink {
    fn save(&self, record: &Record) -> Result<(), SinkError> {
        let line = serde_json::to_string(record)?;
        let mut writer = self.writer.lock().unwrap();
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}

/// In-memory sink collecting records, for tests and dry runs.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<Record>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }
}

impl RecordSink for MemorySink {
    fn save(&self, record: &Record) -> Result<(), SinkError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}
