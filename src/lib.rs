//! # Ironsplit
//!
//! A **streaming file splitter** for large delimited (CSV, TSV, ...) and JSON files.
//! Ironsplit cuts one input into numbered parts by size, row count or part count,
//! optionally projecting and renaming columns and re-encoding the output, without
//! holding delimited input in memory.
//!
//! ## Key Features
//!
//! - **Delimiter sniffing** - comma, tab, semicolon, pipe and asterisk are detected from a sample
//! - **Three partition modes** - by size in MiB, by rows per part, or by number of parts
//! - **Column projection** - keep a subset of columns and rename them on the way out
//! - **Two output formats** - delimited with minimal, all or no quoting, or a JSON array per part
//! - **Cooperative cancellation** - stop between rows; finished parts stay valid
//! - **Run log** - every run appends a reconciliation record to `log.txt`
//! - **Compressed input** - gzip, zstd, bzip2 and xz (all optional via feature flags)
//!
//! ## Quick Start
//!
//! ```no_run
//! use ironsplit::*;
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let request = SplitRequest::new("sales.csv", "split_files")
//!     .with_partition(PartitionMode::ByRowCount, 50_000)
//!     .with_columns(["id", "region", "amount"])
//!     .with_rename("amount", "total");
//!
//! let result = run_split(&request, &CancelToken::new(), &mut ())?;
//! println!("{} parts, validation {}", result.parts.len(), result.validation());
//! # Ok(())
//! # }
//! ```
//!
//! ## Running in the background
//!
//! [`SplitHandle`] runs a request on a worker thread and reports through an event
//! queue, which is what interactive front ends use:
//!
//! ```no_run
//! use ironsplit::*;
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let handle = SplitHandle::start(SplitRequest::new("big.json", "out"))?;
//! for event in handle.events() {
//!     match event {
//!         SplitEvent::Progress(p) => eprintln!("{}/{}", p.rows_processed, p.rows_total),
//!         SplitEvent::Finished(outcome) => {
//!             outcome?;
//!             break;
//!         }
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`request`] - What to split and how
//! - [`io`] - Format readers, delimiter sniffing, compression and part writers
//! - [`project`] - Column inclusion and renaming
//! - [`policy`] - When to roll over to a new part
//! - [`engine`] - The two-pass run, progress events and background execution
//! - [`report`] - Row reconciliation and the run log
//! - [`config`] - Persisted user preferences
//! - [`testing`] - Fixtures and recorders for tests

pub mod cancel;
pub mod config;
pub mod engine;
pub mod error;
pub mod io;
pub mod policy;
pub mod project;
pub mod report;
pub mod request;
pub mod testing;

pub use cancel::CancelToken;
pub use config::{Settings, SettingsStore};
pub use engine::{
    CancelPhase, ColumnSummary, EventSink, ProgressEvent, RunResult, RunState, RunStatus,
    SplitEngine, SplitEvent, SplitHandle, run_split, spawn_split,
};
pub use error::{ErrorCategory, SplitError, categorize};
pub use io::reader::{Header, InputFormat, InputSource, Row};
pub use io::writer::PartSummary;
pub use policy::{Limit, PartitionPolicy, ResolvedLimit};
pub use project::Projection;
pub use report::Validation;
pub use request::{OutputFormat, PartitionMode, Quoting, SplitRequest};
