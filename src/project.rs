//! Column Projector: column inclusion and renaming, resolved once per run.

use crate::io::reader::Row;
use std::collections::{BTreeMap, HashSet};

/// The surviving input columns and the names they are written under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    source_columns: Vec<String>,
    output_header: Vec<String>,
}

impl Projection {
    /// Keep the columns of `header` that appear in `included`, in `header`'s order,
    /// naming each through `renames` when it has an entry.
    ///
    /// An empty `included` is not rejected here; [`SplitRequest::validate`]
    /// refuses it before a run starts.
    ///
    /// [`SplitRequest::validate`]: crate::SplitRequest::validate
    #[must_use]
    pub fn new(header: &[String], included: &[String], renames: &BTreeMap<String, String>) -> Self {
        let keep: HashSet<&str> = included.iter().map(String::as_str).collect();
        let source_columns: Vec<String> = header
            .iter()
            .filter(|c| keep.contains(c.as_str()))
            .cloned()
            .collect();
        let output_header = source_columns
            .iter()
            .map(|c| renames.get(c).unwrap_or(c).clone())
            .collect();
        Self {
            source_columns,
            output_header,
        }
    }

    /// Header written to parts (post-rename).
    #[must_use]
    pub fn output_header(&self) -> &[String] {
        &self.output_header
    }

    /// Input column names that survive, in header order.
    #[must_use]
    pub fn source_columns(&self) -> &[String] {
        &self.source_columns
    }

    /// Input columns dropped by this projection, in header order.
    #[must_use]
    pub fn excluded<'a>(&self, header: &'a [String]) -> Vec<&'a str> {
        let kept: HashSet<&str> = self.source_columns.iter().map(String::as_str).collect();
        header
            .iter()
            .map(String::as_str)
            .filter(|c| !kept.contains(c))
            .collect()
    }

    /// Values of `row` for the surviving columns; absent columns become `""`.
    #[must_use]
    pub fn apply(&self, row: &Row) -> Vec<String> {
        self.source_columns
            .iter()
            .map(|c| row.get(c).unwrap_or_default().to_string())
            .collect()
    }
}
