//! Format Reader: turns an input file into a header and a forward-only row stream.
//!
//! Two input shapes are understood:
//! - **Delimited text**: the first record is the header; the separator is sniffed
//!   from the first 2 KiB unless the request overrides it (see [`crate::io::sniff`]).
//! - **JSON**: an array of objects or a single object. Nested objects are flattened
//!   into dot-separated column names; an array whose first element is an object is
//!   flattened through that first element; other arrays are kept as compact JSON text.
//!
//! Every pass calls [`InputSource::open`] again, so the two engine passes never share
//! reader state.

use crate::error::SplitError;
use crate::io::compression::open_input_stream;
use crate::io::sniff::{detect_delimiter, DEFAULT_DELIMITER, SAMPLE_BYTES};
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Ordered, unique column names.
pub type Header = Vec<String>;

/// Number of array elements after the first scanned for extra JSON keys.
pub const JSON_HEADER_SCAN: usize = 100;

type InputStream = BufReader<Box<dyn Read>>;

/// Detected encoding of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Delimited { delimiter: u8 },
    Json,
}

/// One input record: column name to string value.
///
/// Delimited rows keep their fields positionally and share the header's index;
/// JSON rows own their flattened key/value pairs.
#[derive(Debug, Clone)]
pub enum Row {
    Fields {
        index: Arc<HashMap<String, usize>>,
        values: Vec<String>,
    },
    Object(HashMap<String, String>),
}

impl Row {
    /// Value for `column`, or `None` when this record does not carry it.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        match self {
            Row::Fields { index, values } => index
                .get(column)
                .and_then(|&i| values.get(i))
                .map(String::as_str),
            Row::Object(map) => map.get(column).map(String::as_str),
        }
    }
}

/// An input file together with its detected format.
#[derive(Debug, Clone)]
pub struct InputSource {
    pub path: PathBuf,
    pub format: InputFormat,
}

impl InputSource {
    /// Decide how to read `path`. Files named `*.json` (optionally compressed) are
    /// JSON; anything else is delimited text whose separator is `delimiter` or, when
    /// `None`, sniffed from the start of the file with a comma fallback.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened for sniffing.
    pub fn detect(path: impl AsRef<Path>, delimiter: Option<u8>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if is_json_path(&path) {
            return Ok(Self {
                path,
                format: InputFormat::Json,
            });
        }
        let delimiter = match delimiter {
            Some(d) => d,
            None => sniff_file(&path)?,
        };
        Ok(Self {
            path,
            format: InputFormat::Delimited { delimiter },
        })
    }

    /// Open a fresh pass over the input.
    ///
    /// # Errors
    /// Returns an error wrapped in [`SplitError::ReadFailed`] if the file cannot be
    /// read or decoded, or [`SplitError::UnsupportedJson`] for JSON of the wrong shape.
    pub fn open(&self) -> Result<(Header, Rows)> {
        let opened = match self.format {
            InputFormat::Delimited { delimiter } => open_delimited(&self.path, delimiter),
            InputFormat::Json => open_json(&self.path),
        };
        opened.with_context(|| SplitError::ReadFailed {
            path: self.path.display().to_string(),
        })
    }
}

fn is_json_path(path: &Path) -> bool {
    let name = path.to_string_lossy().to_lowercase();
    let name = [".gz", ".gzip", ".zst", ".zstd", ".bz2", ".bzip2", ".xz"]
        .iter()
        .find_map(|ext| name.strip_suffix(ext))
        .unwrap_or(&name);
    name.ends_with(".json")
}

fn sniff_file(path: &Path) -> Result<u8> {
    let stream = open_input_stream(path).with_context(|| SplitError::ReadFailed {
        path: path.display().to_string(),
    })?;
    let mut sample = Vec::with_capacity(SAMPLE_BYTES);
    stream
        .take(SAMPLE_BYTES as u64)
        .read_to_end(&mut sample)
        .with_context(|| SplitError::ReadFailed {
            path: path.display().to_string(),
        })?;
    let delimiter = detect_delimiter(&sample).unwrap_or_else(|| {
        tracing::debug!(path = %path.display(), "no delimiter detected, using comma");
        DEFAULT_DELIMITER
    });
    tracing::debug!(path = %path.display(), delimiter = %(delimiter as char).escape_default(), "sniffed delimiter");
    Ok(delimiter)
}

/// Lazy row sequence produced by [`InputSource::open`].
pub struct Rows {
    inner: RowsInner,
    consumed: u64,
}

enum RowsInner {
    Delimited {
        reader: csv::Reader<InputStream>,
        index: Arc<HashMap<String, usize>>,
        record: csv::StringRecord,
    },
    Json(std::vec::IntoIter<Value>),
}

impl Rows {
    /// Skip one record without materialising it. Returns `false` at end of input.
    ///
    /// # Errors
    /// Returns an error if the next record cannot be decoded.
    pub fn advance(&mut self) -> Result<bool> {
        let position = self.consumed + 1;
        let more = match &mut self.inner {
            RowsInner::Delimited { reader, record, .. } => reader
                .read_record(record)
                .with_context(|| format!("read record {position}"))?,
            RowsInner::Json(values) => match values.next() {
                None => false,
                Some(Value::Object(_)) => true,
                Some(other) => {
                    return Err(SplitError::UnsupportedJson(format!(
                        "array element {position} is {}, expected an object",
                        json_kind(&other)
                    ))
                    .into());
                }
            },
        };
        if more {
            self.consumed += 1;
        }
        Ok(more)
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        let position = self.consumed + 1;
        let row = match &mut self.inner {
            RowsInner::Delimited {
                reader,
                index,
                record,
            } => {
                if !reader
                    .read_record(record)
                    .with_context(|| format!("read record {position}"))?
                {
                    return Ok(None);
                }
                Row::Fields {
                    index: Arc::clone(index),
                    values: record.iter().map(str::to_string).collect(),
                }
            }
            RowsInner::Json(values) => match values.next() {
                None => return Ok(None),
                Some(Value::Object(obj)) => Row::Object(flatten_object(&obj).into_iter().collect()),
                Some(other) => {
                    return Err(SplitError::UnsupportedJson(format!(
                        "array element {position} is {}, expected an object",
                        json_kind(&other)
                    ))
                    .into());
                }
            },
        };
        self.consumed += 1;
        Ok(Some(row))
    }
}

impl Iterator for Rows {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}

fn open_delimited(path: &Path, delimiter: u8) -> Result<(Header, Rows)> {
    let stream = open_input_stream(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(stream);

    let mut record = csv::StringRecord::new();
    let header = if reader.read_record(&mut record).context("read header")? {
        unique_header(record.iter().enumerate().map(|(i, name)| {
            if i == 0 {
                name.trim_start_matches('\u{feff}').to_string()
            } else {
                name.to_string()
            }
        }))
    } else {
        Vec::new()
    };

    let index = header
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i))
        .collect();
    Ok((
        header,
        Rows {
            inner: RowsInner::Delimited {
                reader,
                index: Arc::new(index),
                record,
            },
            consumed: 0,
        },
    ))
}

/// Make repeated names unique by suffixing `_2`, `_3`, ...
fn unique_header(names: impl Iterator<Item = String>) -> Header {
    let mut seen = HashSet::new();
    let mut header = Vec::new();
    for name in names {
        let mut candidate = name.clone();
        let mut n = 2;
        while !seen.insert(candidate.clone()) {
            candidate = format!("{name}_{n}");
            n += 1;
        }
        header.push(candidate);
    }
    header
}

fn open_json(path: &Path) -> Result<(Header, Rows)> {
    let stream = open_input_stream(path)?;
    let document: Value = serde_json::from_reader(stream).context("parse JSON")?;
    let elements = match document {
        Value::Array(elements) => elements,
        Value::Object(obj) => vec![Value::Object(obj)],
        other => {
            return Err(SplitError::UnsupportedJson(format!(
                "top-level value is {}, expected an array or an object",
                json_kind(&other)
            ))
            .into());
        }
    };
    let header = json_header(&elements)?;
    Ok((
        header,
        Rows {
            inner: RowsInner::Json(elements.into_iter()),
            consumed: 0,
        },
    ))
}

/// Flattened keys of the first element, then new keys from the next
/// [`JSON_HEADER_SCAN`] elements in first-seen order.
fn json_header(elements: &[Value]) -> Result<Header> {
    let mut header = Vec::new();
    let mut seen = HashSet::new();
    for (i, element) in elements.iter().take(JSON_HEADER_SCAN + 1).enumerate() {
        let Value::Object(obj) = element else {
            return Err(SplitError::UnsupportedJson(format!(
                "array element {} is {}, expected an object",
                i + 1,
                json_kind(element)
            ))
            .into());
        };
        for (key, _) in flatten_object(obj) {
            if seen.insert(key.clone()) {
                header.push(key);
            }
        }
    }
    Ok(header)
}

/// Flatten one JSON object into `(dot.path, text)` pairs in document order.
#[must_use]
pub fn flatten_object(obj: &Map<String, Value>) -> Vec<(String, String)> {
    let mut out = Vec::with_capacity(obj.len());
    flatten_into(obj, None, &mut out);
    out
}

fn flatten_into(obj: &Map<String, Value>, prefix: Option<&str>, out: &mut Vec<(String, String)>) {
    for (key, value) in obj {
        let path = match prefix {
            Some(p) => format!("{p}.{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(inner) => flatten_into(inner, Some(&path), out),
            Value::Array(items) => match items.first() {
                Some(Value::Object(first)) => flatten_into(first, Some(&path), out),
                _ => out.push((path, value.to_string())),
            },
            scalar => out.push((path, scalar_text(scalar))),
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
