//! Exit codes and structured error reports.

use serde::Serialize;

use crate::duplicates::RunSummary;

/// Exit codes for the `ua` binary.
///
/// - 0: Success (completed, identical files found)
/// - 1: General error (bad configuration or unexpected failure)
/// - 2: No identical files found
/// - 3: Partial success (completed, but some files were skipped)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: identical files were found.
    Success = 0,
    /// General error: the run could not be carried out.
    GeneralError = 1,
    /// No duplicates: the run completed but found no identical files.
    NoDuplicates = 2,
    /// Partial success: the run completed but skipped unreadable files.
    PartialSuccess = 3,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "UA000",
            Self::GeneralError => "UA001",
            Self::NoDuplicates => "UA002",
            Self::PartialSuccess => "UA003",
        }
    }

    /// Exit code describing a finished run.
    ///
    /// Skipped files take precedence over the duplicate count.
    #[must_use]
    pub fn for_summary(summary: &RunSummary) -> Self {
        if summary.is_partial() {
            Self::PartialSuccess
        } else if summary.classes == 0 {
            Self::NoDuplicates
        } else {
            Self::Success
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "UA001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Underlying causes, outermost first
    pub causes: Vec<String>,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: err.to_string(),
            causes: err.chain().skip(1).map(ToString::to_string).collect(),
        }
    }
}
