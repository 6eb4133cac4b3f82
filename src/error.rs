//! Error taxonomy for split runs.
//!
//! Library functions return [`anyhow::Result`] with path and row context attached.
//! Failures that a front end needs to tell apart carry a [`SplitError`], either as
//! the root error or as context layered on top of an I/O or decoding error, so
//! callers can `downcast_ref::<SplitError>()` and pick a presentation from
//! [`SplitError::category`].
//!
//! Cancellation is not represented here: a cancelled run is a normal
//! [`RunResult`](crate::RunResult) with status [`Cancelled`](crate::RunStatus::Cancelled).

use thiserror::Error;

/// Broad class of a failure, used for user-facing reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The input file could not be read or decoded.
    Input,
    /// The request was rejected before any work started.
    Configuration,
    /// Writing a part failed.
    Write,
}

/// Classified split failures.
#[derive(Debug, Error)]
pub enum SplitError {
    // ── Configuration ─────────────────────────────────────────────────────────
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // ── Input ─────────────────────────────────────────────────────────────────
    #[error("unsupported JSON input: {0}")]
    UnsupportedJson(String),

    #[error("failed to read {path}")]
    ReadFailed { path: String },

    // ── Write ─────────────────────────────────────────────────────────────────
    #[error("field in column '{column}' needs quoting but quoting is disabled")]
    UnquotableField { column: String },

    #[error("failed to write {path}")]
    WriteFailed { path: String },
}

impl SplitError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            SplitError::InvalidRequest(_) => ErrorCategory::Configuration,
            SplitError::UnsupportedJson(_) | SplitError::ReadFailed { .. } => ErrorCategory::Input,
            SplitError::UnquotableField { .. } | SplitError::WriteFailed { .. } => {
                ErrorCategory::Write
            }
        }
    }
}

/// Classify a run failure. Errors without a [`SplitError`] anywhere in their
/// context are treated as write failures.
#[must_use]
pub fn categorize(err: &anyhow::Error) -> ErrorCategory {
    err.downcast_ref::<SplitError>()
        .map_or(ErrorCategory::Write, SplitError::category)
}
