//! The immutable description of one split run.
//!
//! A [`SplitRequest`] is built by the front end (CLI, GUI, tests) and handed to
//! the engine. [`SplitRequest::validate`] checks it against the input header; the
//! engine runs the same check before it creates any output.

use crate::error::SplitError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// How a delimited writer quotes fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quoting {
    /// Quote only fields containing the delimiter, the quote character or a line break.
    #[default]
    Minimal,
    /// Quote every field.
    All,
    /// Never quote; a field that needs quoting fails the run.
    None,
}

impl Quoting {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Quoting::Minimal => "minimal",
            Quoting::All => "all",
            Quoting::None => "none",
        }
    }
}

/// Encoding of the produced parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Delimited { delimiter: u8, quoting: Quoting },
    Json,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Delimited {
            delimiter: b',',
            quoting: Quoting::Minimal,
        }
    }
}

impl OutputFormat {
    /// Extension used for parts when the request does not name one.
    #[must_use]
    pub fn default_extension(&self) -> &'static str {
        match self {
            OutputFormat::Delimited { .. } => ".csv",
            OutputFormat::Json => ".json",
        }
    }
}

/// What the partition limit counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionMode {
    /// Limit is a part size in MiB.
    BySizeBytes,
    /// Limit is a number of data rows per part.
    ByRowCount,
    /// Limit is the number of parts to produce.
    ByPartCount,
}

impl PartitionMode {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            PartitionMode::BySizeBytes => "size (MB)",
            PartitionMode::ByRowCount => "rows",
            PartitionMode::ByPartCount => "parts",
        }
    }
}

/// Configuration for one split run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitRequest {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    pub mode: PartitionMode,
    /// Positive limit interpreted according to `mode`.
    pub limit: u64,
    /// Columns to keep. `None` keeps every input column.
    pub included_columns: Option<Vec<String>>,
    /// Original column name to output name; only applies to included columns.
    pub renames: BTreeMap<String, String>,
    /// Write the header row at the top of each delimited part.
    pub include_header: bool,
    /// Part file extension including the leading dot. `None` derives it from `format`.
    pub extension: Option<String>,
    /// Append a record to `log.txt` in the output directory.
    pub log_enabled: bool,
    /// Input delimiter override; `None` sniffs it from the file.
    pub input_delimiter: Option<u8>,
}

impl SplitRequest {
    /// A request splitting `input` into 100 000-row CSV parts under `output_dir`.
    pub fn new(input: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input.into(),
            output_dir: output_dir.into(),
            format: OutputFormat::default(),
            mode: PartitionMode::ByRowCount,
            limit: 100_000,
            included_columns: None,
            renames: BTreeMap::new(),
            include_header: true,
            extension: None,
            log_enabled: true,
            input_delimiter: None,
        }
    }

    /// Default output location for an input file: `split_files` next to it.
    pub fn default_output_dir(input: impl AsRef<Path>) -> PathBuf {
        input
            .as_ref()
            .parent()
            .map_or_else(|| PathBuf::from("split_files"), |p| p.join("split_files"))
    }

    #[must_use]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_partition(mut self, mode: PartitionMode, limit: u64) -> Self {
        self.mode = mode;
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.included_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.renames.insert(from.into(), to.into());
        self
    }

    #[must_use]
    pub fn with_header(mut self, include_header: bool) -> Self {
        self.include_header = include_header;
        self
    }

    #[must_use]
    pub fn with_extension(mut self, ext: impl Into<String>) -> Self {
        self.extension = Some(ext.into());
        self
    }

    #[must_use]
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.log_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_input_delimiter(mut self, delimiter: u8) -> Self {
        self.input_delimiter = Some(delimiter);
        self
    }

    /// Extension for part files, always with a leading dot.
    #[must_use]
    pub fn part_extension(&self) -> String {
        match self.extension.as_deref().map(str::trim) {
            Some(ext) if !ext.is_empty() => {
                let ext = ext.to_lowercase();
                if ext.starts_with('.') { ext } else { format!(".{ext}") }
            }
            _ => self.format.default_extension().to_string(),
        }
    }

    /// Input file stem with any compression suffix removed (`data.csv.gz` → `data`).
    #[must_use]
    pub fn base_name(&self) -> String {
        let mut stem = self
            .input_path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "part".to_string());
        for codec_ext in [".gz", ".gzip", ".zst", ".zstd", ".bz2", ".bzip2", ".xz"] {
            if stem.to_lowercase().ends_with(codec_ext) {
                stem.truncate(stem.len() - codec_ext.len());
                break;
            }
        }
        match stem.rfind('.') {
            Some(dot) if dot > 0 => stem[..dot].to_string(),
            _ => stem,
        }
    }

    /// Path of the `index`-th part (1-based).
    #[must_use]
    pub fn part_path(&self, index: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}{}", self.base_name(), index, self.part_extension()))
    }

    /// Included columns in the order the caller gave them; all of `header` when unset.
    #[must_use]
    pub fn resolved_columns(&self, header: &[String]) -> Vec<String> {
        self.included_columns
            .clone()
            .unwrap_or_else(|| header.to_vec())
    }

    /// Reject requests the engine must never start with.
    ///
    /// Checks a positive limit, a usable output delimiter, a non-empty column
    /// selection that is a subset of `header`, and pairwise distinct output names.
    /// Renames of excluded columns are ignored.
    ///
    /// # Errors
    /// Returns [`SplitError::InvalidRequest`] describing the first violation.
    pub fn validate(&self, header: &[String]) -> Result<(), SplitError> {
        if self.limit == 0 {
            return Err(SplitError::InvalidRequest(
                "split limit must be a positive number".into(),
            ));
        }
        if let OutputFormat::Delimited { delimiter, .. } = self.format
            && (delimiter == b'"' || delimiter == b'\n' || delimiter == b'\r')
        {
            return Err(SplitError::InvalidRequest(format!(
                "'{}' cannot be used as a delimiter",
                (delimiter as char).escape_default()
            )));
        }

        // An empty header means an empty input: nothing to select from, nothing to write.
        if header.is_empty() {
            return Ok(());
        }

        let included = self.resolved_columns(header);
        if included.is_empty() {
            return Err(SplitError::InvalidRequest(
                "select at least one column".into(),
            ));
        }
        let known: HashSet<&str> = header.iter().map(String::as_str).collect();
        if let Some(missing) = included.iter().find(|c| !known.contains(c.as_str())) {
            return Err(SplitError::InvalidRequest(format!(
                "column '{missing}' is not in the input header"
            )));
        }

        let included_set: HashSet<&str> = included.iter().map(String::as_str).collect();
        let mut seen = HashSet::new();
        for column in header.iter().filter(|c| included_set.contains(c.as_str())) {
            let renamed = self.renames.get(column);
            let output = renamed.unwrap_or(column);
            if renamed.is_some() && output.is_empty() {
                return Err(SplitError::InvalidRequest(format!(
                    "column '{column}' cannot be renamed to an empty name"
                )));
            }
            if !seen.insert(output.as_str()) {
                return Err(SplitError::InvalidRequest(format!(
                    "output column name '{output}' is used more than once"
                )));
            }
        }
        Ok(())
    }
}
