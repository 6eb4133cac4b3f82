//! Testing utilities for split runs.
//!
//! - **Fixtures**: write small delimited and JSON inputs into a temp directory
//! - **Part readers**: read output parts back for assertions
//! - **Recording sink**: an [`EventSink`](crate::EventSink) that keeps every event
//!   and can cancel the run at a chosen row
//!
//! ```no_run
//! use ironsplit::*;
//! use ironsplit::testing::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let dir = tempfile::tempdir()?;
//! let input = write_csv_fixture(dir.path(), "in.csv", &numbered_csv(250))?;
//! let request = SplitRequest::new(&input, dir.path().join("out"))
//!     .with_partition(PartitionMode::ByRowCount, 100);
//!
//! let mut sink = RecordingSink::default();
//! let result = run_split(&request, &CancelToken::new(), &mut sink)?;
//! assert_eq!(result.part_row_counts(), vec![100, 100, 50]);
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod fixtures;

pub use assertions::*;
pub use fixtures::*;
