//! Format Writer: encodes projected rows into one output part.
//!
//! - [`DelimitedPartWriter`] counts bytes as the csv writer hands them to the file
//!   and flushes after every record, so the running count is the part's exact size.
//! - [`JsonPartWriter`] buffers row objects and writes the part as one compact JSON
//!   array on [`PartWriter::close`]. Until then its byte count is an estimate: the
//!   first [`JSON_EXACT_ROWS`] rows are measured exactly and later rows are assumed
//!   to match their running average.

use crate::error::SplitError;
use crate::request::{OutputFormat, Quoting};
use anyhow::{Context, Result};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Rows per JSON part whose serialized size is measured exactly.
pub const JSON_EXACT_ROWS: u64 = 10;

/// Row and byte totals of a closed part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartSummary {
    /// 1-based part number.
    pub index: usize,
    pub path: PathBuf,
    pub rows: u64,
    pub bytes: u64,
}

/// An open output part.
pub trait PartWriter: Send {
    /// Append one row of projected values, in output header order.
    fn write_row(&mut self, values: &[String]) -> Result<()>;

    /// Data rows written so far.
    fn rows(&self) -> u64;

    /// Bytes written so far (estimated for JSON parts).
    fn bytes(&self) -> u64;

    /// Flush everything and report the part's final totals.
    fn close(self: Box<Self>) -> Result<PartSummary>;
}

/// Create the file at `path` and return a writer for `format`.
///
/// # Errors
/// Returns an error if the file cannot be created or the header cannot be written.
pub fn open_part(
    index: usize,
    path: &Path,
    format: OutputFormat,
    header: &[String],
    include_header: bool,
) -> Result<Box<dyn PartWriter>> {
    let writer: Box<dyn PartWriter> = match format {
        OutputFormat::Delimited { delimiter, quoting } => Box::new(DelimitedPartWriter::create(
            index,
            path,
            header,
            delimiter,
            quoting,
            include_header,
        )?),
        OutputFormat::Json => Box::new(JsonPartWriter::create(index, path, header)?),
    };
    Ok(writer)
}

/// Byte-counting pass-through over the part file.
#[derive(Debug)]
struct CountingWriter<W> {
    inner: W,
    bytes: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.bytes += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Delimited-text part with a configurable separator and quoting discipline.
pub struct DelimitedPartWriter {
    index: usize,
    path: PathBuf,
    csv: csv::Writer<CountingWriter<BufWriter<File>>>,
    header: Vec<String>,
    delimiter: u8,
    quoting: Quoting,
    rows: u64,
}

impl DelimitedPartWriter {
    /// # Errors
    /// Returns an error if the file cannot be created or the header cannot be written.
    pub fn create(
        index: usize,
        path: &Path,
        header: &[String],
        delimiter: u8,
        quoting: Quoting,
        include_header: bool,
    ) -> Result<Self> {
        let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        let quote_style = match quoting {
            Quoting::Minimal => QuoteStyle::Necessary,
            Quoting::All => QuoteStyle::Always,
            Quoting::None => QuoteStyle::Never,
        };
        let csv = WriterBuilder::new()
            .has_headers(false)
            .delimiter(delimiter)
            .quote_style(quote_style)
            .terminator(Terminator::CRLF)
            .from_writer(CountingWriter {
                inner: BufWriter::new(file),
                bytes: 0,
            });
        let mut writer = Self {
            index,
            path: path.to_path_buf(),
            csv,
            header: header.to_vec(),
            delimiter,
            quoting,
            rows: 0,
        };
        if include_header {
            let header = writer.header.clone();
            writer.emit(&header).context("write header row")?;
        }
        Ok(writer)
    }

    /// Write one record and flush it, so the counted bytes match the file length.
    fn emit(&mut self, values: &[String]) -> Result<()> {
        if self.quoting == Quoting::None
            && let Some(i) = values.iter().position(|v| self.needs_quotes(v))
        {
            return Err(SplitError::UnquotableField {
                column: self.header.get(i).cloned().unwrap_or_default(),
            }
            .into());
        }
        self.csv
            .write_record(values)
            .and_then(|()| self.csv.flush().map_err(csv::Error::from))
            .with_context(|| format!("write {}", self.path.display()))?;
        Ok(())
    }

    fn needs_quotes(&self, value: &str) -> bool {
        value
            .bytes()
            .any(|b| b == self.delimiter || b == b'"' || b == b'\n' || b == b'\r')
    }
}

impl PartWriter for DelimitedPartWriter {
    fn write_row(&mut self, values: &[String]) -> Result<()> {
        self.emit(values)
            .with_context(|| format!("write row {} of {}", self.rows + 1, self.path.display()))?;
        self.rows += 1;
        Ok(())
    }

    fn rows(&self) -> u64 {
        self.rows
    }

    fn bytes(&self) -> u64 {
        self.csv.get_ref().bytes
    }

    fn close(mut self: Box<Self>) -> Result<PartSummary> {
        self.csv
            .flush()
            .with_context(|| format!("flush {}", self.path.display()))?;
        let bytes = self.csv.get_ref().bytes;
        Ok(PartSummary {
            index: self.index,
            path: self.path,
            rows: self.rows,
            bytes,
        })
    }
}

/// JSON-array part, materialised in memory and written once on close.
pub struct JsonPartWriter {
    index: usize,
    path: PathBuf,
    file: File,
    header: Vec<String>,
    objects: Vec<Value>,
    measured_bytes: u64,
    estimated_bytes: u64,
}

impl JsonPartWriter {
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create(index: usize, path: &Path, header: &[String]) -> Result<Self> {
        let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        Ok(Self {
            index,
            path: path.to_path_buf(),
            file,
            header: header.to_vec(),
            objects: Vec::new(),
            measured_bytes: 0,
            // Opening and closing brackets.
            estimated_bytes: 2,
        })
    }
}

impl PartWriter for JsonPartWriter {
    fn write_row(&mut self, values: &[String]) -> Result<()> {
        let object: Map<String, Value> = self
            .header
            .iter()
            .cloned()
            .zip(values.iter().cloned().map(Value::String))
            .collect();
        let object = Value::Object(object);

        let rows = self.objects.len() as u64;
        if rows < JSON_EXACT_ROWS {
            let size = serde_json::to_vec(&object)
                .context("serialize JSON row")?
                .len() as u64;
            self.measured_bytes += size;
            self.estimated_bytes += size + 1;
        } else {
            self.estimated_bytes += self.measured_bytes / JSON_EXACT_ROWS + 1;
        }
        self.objects.push(object);
        Ok(())
    }

    fn rows(&self) -> u64 {
        self.objects.len() as u64
    }

    fn bytes(&self) -> u64 {
        self.estimated_bytes
    }

    fn close(mut self: Box<Self>) -> Result<PartSummary> {
        let encoded = serde_json::to_vec(&self.objects).context("serialize JSON part")?;
        self.file
            .write_all(&encoded)
            .and_then(|()| self.file.flush())
            .with_context(|| format!("write {}", self.path.display()))?;
        Ok(PartSummary {
            index: self.index,
            path: self.path,
            rows: self.objects.len() as u64,
            bytes: encoded.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn delimited_byte_count_tracks_the_file_length() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("part_1.csv");
        let header = strings(&["id", "note"]);
        let mut writer: Box<dyn PartWriter> = Box::new(DelimitedPartWriter::create(
            1,
            &path,
            &header,
            b',',
            Quoting::Minimal,
            true,
        )?);
        assert_eq!(writer.bytes(), std::fs::metadata(&path)?.len());
        assert_eq!(writer.bytes(), 9);

        writer.write_row(&strings(&["1", "has, comma"]))?;
        assert_eq!(writer.bytes(), std::fs::metadata(&path)?.len());
        assert_eq!(writer.rows(), 1);

        let summary = writer.close()?;
        assert_eq!(summary.bytes, std::fs::metadata(&path)?.len());
        assert_eq!(std::fs::read(&path)?, b"id,note\r\n1,\"has, comma\"\r\n");
        Ok(())
    }
}
