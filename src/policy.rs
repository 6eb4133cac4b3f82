//! Partition Policy: when to close the current part and open the next.
//!
//! The decision is taken *before* a row is written, so the row that triggers a
//! rollover always lands at the top of the new part.

use crate::request::PartitionMode;
use serde::Serialize;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// A limit with part-count requests already turned into rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Limit {
    Bytes(u64),
    Rows(u64),
}

/// Outcome of resolving a request's partition settings against the input size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedLimit {
    pub limit: Limit,
    /// Set when a part-count request cannot produce the requested number of parts,
    /// either because there are fewer rows than parts or because the rounded-up row
    /// limit fills fewer parts; holds the part count actually achievable.
    pub reduced_parts: Option<u64>,
}

impl ResolvedLimit {
    /// Resolve `mode`/`limit` once the number of data rows is known.
    ///
    /// `ByPartCount` becomes a row limit of `ceil(total_rows / parts)`, clamped to
    /// one row per part when more parts than rows are requested. Either way the
    /// achieved count `ceil(total_rows / limit)` is reported when it falls short.
    #[must_use]
    pub fn resolve(mode: PartitionMode, limit: u64, total_rows: u64) -> Self {
        match mode {
            PartitionMode::BySizeBytes => Self {
                limit: Limit::Bytes(limit.saturating_mul(BYTES_PER_MB)),
                reduced_parts: None,
            },
            PartitionMode::ByRowCount => Self {
                limit: Limit::Rows(limit),
                reduced_parts: None,
            },
            PartitionMode::ByPartCount => {
                let parts = limit.max(1);
                if total_rows > 0 && parts > total_rows {
                    return Self {
                        limit: Limit::Rows(1),
                        reduced_parts: Some(total_rows),
                    };
                }
                let rows = total_rows.div_ceil(parts).max(1);
                // Rounding up can leave fewer parts than asked, e.g. 10 rows in 6 parts.
                let achieved = total_rows.div_ceil(rows);
                Self {
                    limit: Limit::Rows(rows),
                    reduced_parts: (total_rows > 0 && achieved < parts).then_some(achieved),
                }
            }
        }
    }
}

/// Stateless rollover predicate over an open part's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionPolicy {
    limit: Limit,
}

impl PartitionPolicy {
    #[must_use]
    pub fn new(limit: Limit) -> Self {
        Self { limit }
    }

    /// Whether the part holding `rows_in_part` rows and `bytes_in_part` bytes must be
    /// closed before the next row. A part without rows is never rolled over.
    #[must_use]
    pub fn should_rollover(&self, rows_in_part: u64, bytes_in_part: u64) -> bool {
        if rows_in_part == 0 {
            return false;
        }
        match self.limit {
            Limit::Rows(max) => rows_in_part >= max,
            Limit::Bytes(max) => bytes_in_part >= max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_count_resolves_to_ceiling_rows() {
        let r = ResolvedLimit::resolve(PartitionMode::ByPartCount, 4, 250);
        assert_eq!(r.limit, Limit::Rows(63));
        assert_eq!(r.reduced_parts, None);
    }

    #[test]
    fn part_count_above_rows_is_clamped() {
        let r = ResolvedLimit::resolve(PartitionMode::ByPartCount, 10, 3);
        assert_eq!(r.limit, Limit::Rows(1));
        assert_eq!(r.reduced_parts, Some(3));
    }

    #[test]
    fn rounded_row_limit_reports_fewer_parts() {
        let r = ResolvedLimit::resolve(PartitionMode::ByPartCount, 6, 10);
        assert_eq!(r.limit, Limit::Rows(2));
        assert_eq!(r.reduced_parts, Some(5));

        let exact = ResolvedLimit::resolve(PartitionMode::ByPartCount, 5, 10);
        assert_eq!(exact.reduced_parts, None);
    }

    #[test]
    fn empty_input_is_not_a_reduction() {
        let r = ResolvedLimit::resolve(PartitionMode::ByPartCount, 4, 0);
        assert_eq!(r.reduced_parts, None);
    }

    #[test]
    fn size_limit_is_in_mebibytes() {
        let r = ResolvedLimit::resolve(PartitionMode::BySizeBytes, 2, 0);
        assert_eq!(r.limit, Limit::Bytes(2 * 1024 * 1024));
    }

    #[test]
    fn empty_part_never_rolls_over() {
        let p = PartitionPolicy::new(Limit::Bytes(10));
        assert!(!p.should_rollover(0, 500));
        assert!(p.should_rollover(1, 10));
        assert!(!p.should_rollover(1, 9));
    }
}
