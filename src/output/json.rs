//! JSON output formatter for run results.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "classes": [
//!     {
//!       "digest": "5d41402abc4b2a76b9719d911017c592",
//!       "head": "a.txt",
//!       "members": ["b.txt"]
//!     }
//!   ],
//!   "summary": {
//!     "input_files": 3,
//!     "classes": 1,
//!     "duplicate_files": 1,
//!     "skipped_files": 0,
//!     "duration_ms": 4,
//!     "exit_code": 0,
//!     "exit_code_name": "UA000"
//!   }
//! }
//! ```
//!
//! `digest` is `null` for classes settled by direct comparison.

use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;

use crate::duplicates::{EquivalenceClass, RunSummary};
use crate::error::ExitCode;

/// A single class in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonClass {
    /// Digest as lowercase hex, when one was computed
    pub digest: Option<String>,
    /// First file of the class
    pub head: String,
    /// Files identical to the head
    pub members: Vec<String>,
}

impl JsonClass {
    /// Convert an [`EquivalenceClass`]. Paths are printed as given.
    #[must_use]
    pub fn from_class(class: &EquivalenceClass) -> Self {
        Self {
            digest: class.digest.map(|d| d.to_hex()),
            head: class.head.to_string_lossy().into_owned(),
            members: class
                .members
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
        }
    }
}

/// A skipped file in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSkipped {
    /// Path of the file
    pub path: String,
    /// Error kind (`open`, `stat`, `allocation`, `digest`)
    pub kind: &'static str,
    /// Error message
    pub message: String,
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Paths handed to the run
    pub input_files: usize,
    /// Paths given more than once
    pub repeated_paths: usize,
    /// Candidate buckets processed
    pub buckets: usize,
    /// Files dropped by size alone
    pub eliminated_by_size: usize,
    /// Files settled by direct comparison
    pub compared_directly: usize,
    /// Files dropped by prefix digests
    pub eliminated_by_milestone: usize,
    /// Files digested
    pub digested_files: usize,
    /// Classes found
    pub classes: usize,
    /// Files matched to a class head
    pub duplicate_files: usize,
    /// Files skipped because of errors
    pub skipped_files: usize,
    /// Skipped files per error kind
    pub skipped_by_kind: BTreeMap<&'static str, usize>,
    /// Every skipped file
    pub skipped: Vec<JsonSkipped>,
    /// Duration of the run in milliseconds
    pub duration_ms: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "UA000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Create a JSON summary from a [`RunSummary`] and an exit code.
    #[must_use]
    pub fn from_run_summary(summary: &RunSummary, exit_code: ExitCode) -> Self {
        Self {
            input_files: summary.input_files,
            repeated_paths: summary.repeated_paths,
            buckets: summary.buckets,
            eliminated_by_size: summary.eliminated_by_size,
            compared_directly: summary.compared_directly,
            eliminated_by_milestone: summary.eliminated_by_milestone,
            digested_files: summary.digested_files,
            classes: summary.classes,
            duplicate_files: summary.duplicate_files,
            skipped_files: summary.skipped_files(),
            skipped_by_kind: summary.skipped_by_kind(),
            skipped: summary
                .errors
                .iter()
                .map(|e| JsonSkipped {
                    path: e.path().to_string_lossy().into_owned(),
                    kind: e.kind(),
                    message: e.to_string(),
                })
                .collect(),
            duration_ms: u64::try_from(summary.duration.as_millis()).unwrap_or(u64::MAX),
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Classes of identical files
    pub classes: Vec<JsonClass>,
    /// Run summary statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Create a JSON output from classes, summary and exit code.
    ///
    /// # Example
    ///
    /// ```
    /// use ua::duplicates::{EquivalenceClass, RunSummary};
    /// use ua::error::ExitCode;
    /// use ua::output::json::JsonOutput;
    /// use std::path::PathBuf;
    ///
    /// let classes = vec![EquivalenceClass::pair(PathBuf::from("a"), PathBuf::from("b"))];
    /// let output = JsonOutput::new(&classes, &RunSummary::default(), ExitCode::Success);
    /// assert_eq!(output.classes.len(), 1);
    /// assert!(output.classes[0].digest.is_none());
    /// ```
    #[must_use]
    pub fn new(classes: &[EquivalenceClass], summary: &RunSummary, exit_code: ExitCode) -> Self {
        Self {
            classes: classes.iter().map(JsonClass::from_class).collect(),
            summary: JsonSummary::from_run_summary(summary, exit_code),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        if pretty {
            serde_json::to_writer_pretty(&mut *writer, self)?;
        } else {
            serde_json::to_writer(&mut *writer, self)?;
        }
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON output: {0}")]
    Io(#[from] std::io::Error),
}
