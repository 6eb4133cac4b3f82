//! Delimiter detection for delimited-text input.
//!
//! The first [`SAMPLE_BYTES`] of the input are scanned line by line. For each
//! candidate separator we count occurrences outside double quotes on every line
//! and take the most frequent non-zero count as its expected width. The winner is
//! the candidate whose expected width holds on the largest share of lines, then
//! the one with more fields, then the earlier entry in [`CANDIDATES`].

use std::collections::HashMap;

/// Bytes read from the start of the input for detection.
pub const SAMPLE_BYTES: usize = 2048;

/// Separators considered, in order of preference.
pub const CANDIDATES: [u8; 5] = [b',', b'\t', b';', b'|', b'*'];

/// Fallback when no candidate appears in the sample.
pub const DEFAULT_DELIMITER: u8 = b',';

/// Infer the separator used by `sample`, or `None` if no candidate occurs.
#[must_use]
pub fn detect_delimiter(sample: &[u8]) -> Option<u8> {
    let text = String::from_utf8_lossy(sample);
    let mut lines: Vec<&str> = text.split('\n').collect();
    // A full sample most likely ends mid-record.
    if sample.len() >= SAMPLE_BYTES && lines.len() > 1 {
        lines.pop();
    }
    let lines: Vec<&str> = lines
        .into_iter()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return None;
    }

    let mut best: Option<(u8, usize, usize)> = None;
    for &candidate in &CANDIDATES {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_unquoted(line, candidate))
            .collect();
        let Some(width) = modal_width(&counts) else {
            continue;
        };
        let agreeing = counts.iter().filter(|&&c| c == width).count();
        let better = match best {
            None => true,
            Some((_, best_agreeing, best_width)) => {
                (agreeing, width) > (best_agreeing, best_width)
            }
        };
        if better {
            best = Some((candidate, agreeing, width));
        }
    }
    best.map(|(candidate, _, _)| candidate)
}

fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for byte in line.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
        } else if byte == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

/// Most frequent non-zero count; ties go to the larger count.
fn modal_width(counts: &[usize]) -> Option<usize> {
    let mut freq: HashMap<usize, usize> = HashMap::new();
    for &c in counts.iter().filter(|&&c| c > 0) {
        *freq.entry(c).or_default() += 1;
    }
    freq.into_iter()
        .max_by_key(|&(width, seen)| (seen, width))
        .map(|(width, _)| width)
}
