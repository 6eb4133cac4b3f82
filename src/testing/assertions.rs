//! Event recording and assertions over run outcomes.

use crate::cancel::CancelToken;
use crate::engine::{EventSink, ProgressEvent, RunResult, RunState};
use crate::io::writer::PartSummary;

/// An [`EventSink`] that records everything it receives.
///
/// With [`cancel_at`](Self::cancel_at) it also cancels `token` as soon as a
/// progress event reports at least the given number of processed rows in the
/// given state.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub states: Vec<RunState>,
    pub progress: Vec<ProgressEvent>,
    pub parts: Vec<PartSummary>,
    pub reductions: Vec<(u64, u64)>,
    cancel: Option<(CancelToken, RunState, u64)>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel `token` once `rows` rows have been reported in `state`.
    #[must_use]
    pub fn cancel_at(token: CancelToken, state: RunState, rows: u64) -> Self {
        Self {
            cancel: Some((token, state, rows)),
            ..Self::default()
        }
    }

    /// The last state received, if any.
    #[must_use]
    pub fn last_state(&self) -> Option<RunState> {
        self.states.last().copied()
    }
}

impl EventSink for RecordingSink {
    fn on_state(&mut self, state: RunState) {
        self.states.push(state);
    }

    fn on_progress(&mut self, event: &ProgressEvent) {
        if let Some((token, state, rows)) = &self.cancel
            && event.state == *state
            && event.rows_processed >= *rows
        {
            token.cancel();
        }
        self.progress.push(event.clone());
    }

    fn on_part_closed(&mut self, part: &PartSummary) {
        self.parts.push(part.clone());
    }

    fn on_part_count_reduced(&mut self, requested: u64, effective: u64) {
        self.reductions.push((requested, effective));
    }
}

/// Assert that every input row of `result` reached an output part.
///
/// # Panics
/// Panics if the totals disagree or the part counts do not add up.
pub fn assert_rows_conserved(result: &RunResult) {
    let summed: u64 = result.parts.iter().map(|p| p.rows).sum();
    assert_eq!(
        summed, result.total_output_rows,
        "part rows do not add up to the output total"
    );
    assert_eq!(
        result.total_input_rows, result.total_output_rows,
        "input and output row totals differ"
    );
}

/// Assert that parts are numbered `1..=n` with no gaps.
///
/// # Panics
/// Panics on a gap or out-of-order index.
pub fn assert_parts_numbered(result: &RunResult) {
    for (i, part) in result.parts.iter().enumerate() {
        assert_eq!(part.index, i + 1, "part {} has index {}", i + 1, part.index);
    }
}
