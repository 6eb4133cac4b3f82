//! Validation & Logger.
//!
//! After a completed or cancelled run the engine reconciles input and output row
//! totals and, when the request enables it, appends one record block to
//! `log.txt` in the output directory. The file is only ever appended to.
//!
//! ```text
//!
//! ============================================================
//! Timestamp:        2025-05-05 14:03:11
//! Status:           COMPLETED
//! Input file:       /data/export.csv (1048576 bytes)
//! ...
//! Validation:       PASS
//! ============================================================
//! ```

use crate::engine::{RunResult, RunStatus};
use crate::policy::Limit;
use crate::request::{OutputFormat, SplitRequest};
use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use std::fmt::{self, Write as _};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Name of the shared run log inside the output directory.
pub const LOG_FILE_NAME: &str = "log.txt";

const SEPARATOR_WIDTH: usize = 60;

/// Row reconciliation verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Validation {
    Pass,
    Fail,
}

impl Validation {
    /// PASS when a completed run wrote every input row; cancelled runs always FAIL.
    #[must_use]
    pub fn of(result: &RunResult) -> Self {
        match result.status {
            RunStatus::Completed if result.total_input_rows == result.total_output_rows => {
                Validation::Pass
            }
            _ => Validation::Fail,
        }
    }
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Validation::Pass => "PASS",
            Validation::Fail => "FAIL",
        })
    }
}

/// Location of the run log for `request`.
#[must_use]
pub fn log_path(request: &SplitRequest) -> PathBuf {
    request.output_dir.join(LOG_FILE_NAME)
}

/// Render the log block for one run, including the leading blank line.
#[must_use]
pub fn render_record(request: &SplitRequest, result: &RunResult) -> String {
    let separator = "=".repeat(SEPARATOR_WIDTH);
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_record(&mut out, &separator, request, result);
    out
}

fn write_record(
    out: &mut String,
    separator: &str,
    request: &SplitRequest,
    result: &RunResult,
) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "{separator}")?;
    writeln!(out, "Timestamp:        {}", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
    match result.status {
        RunStatus::Completed => writeln!(out, "Status:           COMPLETED")?,
        RunStatus::Cancelled(phase) => {
            writeln!(out, "Status:           CANCELLED ({})", phase.label())?;
        }
    }
    writeln!(
        out,
        "Input file:       {} ({} bytes)",
        result.input_path.display(),
        result.input_bytes
    )?;
    writeln!(out, "Output directory: {}", result.output_dir.display())?;

    let limit = match result.effective_limit {
        Some(Limit::Rows(rows)) if rows != request.limit => format!(" (row limit {rows})"),
        _ => String::new(),
    };
    writeln!(
        out,
        "Split by:         {} = {}{limit}",
        request.mode.label(),
        request.limit
    )?;
    if let Some(parts) = result.reduced_parts {
        writeln!(
            out,
            "Note:             {} parts requested, reduced to {parts}",
            request.limit
        )?;
    }

    match request.format {
        OutputFormat::Delimited { delimiter, quoting } => {
            writeln!(out, "Output format:    delimited")?;
            writeln!(
                out,
                "Delimiter:        '{}'",
                (delimiter as char).escape_default()
            )?;
            writeln!(out, "Quoting:          {}", quoting.label())?;
            writeln!(
                out,
                "Header retained:  {}",
                if request.include_header { "yes" } else { "no" }
            )?;
        }
        OutputFormat::Json => writeln!(out, "Output format:    json")?,
    }

    let columns = &result.columns;
    writeln!(
        out,
        "Columns included: {} ({})",
        columns.included.len(),
        join_or_none(&columns.included)
    )?;
    writeln!(
        out,
        "Columns excluded: {} ({})",
        columns.excluded.len(),
        join_or_none(&columns.excluded)
    )?;
    if !columns.renamed.is_empty() {
        let renamed: Vec<String> = columns
            .renamed
            .iter()
            .map(|(from, to)| format!("{from} -> {to}"))
            .collect();
        writeln!(out, "Columns renamed:  {}", renamed.join(", "))?;
    }

    writeln!(out, "Parts:            {}", result.parts.len())?;
    for part in &result.parts {
        let name = part
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        writeln!(out, "  {name}: {} rows, {} bytes", part.rows, part.bytes)?;
    }
    writeln!(out, "Total input rows:  {}", result.total_input_rows)?;
    writeln!(out, "Total output rows: {}", result.total_output_rows)?;
    writeln!(out, "Elapsed:          {:.2} s", result.elapsed.as_secs_f64())?;
    writeln!(out, "Validation:       {}", result.validation())?;
    writeln!(out, "{separator}")
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

/// Append the record for `result` to the output directory's `log.txt`.
///
/// # Errors
/// Returns an error if the log cannot be opened or written. Callers treat this
/// as advisory.
pub fn append_run_log(request: &SplitRequest, result: &RunResult) -> Result<()> {
    let path = log_path(request);
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open {}", path.display()))?;
    file.write_all(render_record(request, result).as_bytes())
        .with_context(|| format!("append to {}", path.display()))?;
    tracing::debug!(path = %path.display(), "appended run log");
    Ok(())
}
