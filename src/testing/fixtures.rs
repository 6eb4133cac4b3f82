//! Input fixtures and output part readers.

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Write `contents` to `dir/name` and return the path.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_csv_fixture(dir: &Path, name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

/// Serialize `value` to `dir/name` and return the path.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_json_fixture(dir: &Path, name: &str, value: &Value) -> Result<PathBuf> {
    let path = dir.join(name);
    let bytes = serde_json::to_vec_pretty(value).context("serialize fixture")?;
    fs::write(&path, bytes).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

/// `id,name,amount` followed by `rows` data rows; `id` runs from 1.
#[must_use]
pub fn numbered_csv(rows: u64) -> String {
    let mut out = String::from("id,name,amount\n");
    for i in 1..=rows {
        out.push_str(&format!("{i},name{i},{}.{:02}\n", i * 3, i % 100));
    }
    out
}

/// Every record of a delimited part, header included when present.
///
/// # Errors
/// Returns an error if the part cannot be read or parsed.
pub fn read_delimited_part(path: &Path, delimiter: u8) -> Result<Vec<Vec<String>>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("open {}", path.display()))?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec.with_context(|| format!("read {}", path.display()))?;
        out.push(rec.iter().map(str::to_string).collect());
    }
    Ok(out)
}

/// The objects of a JSON part, keys in file order.
///
/// # Errors
/// Returns an error if the part is not a JSON array of objects.
pub fn read_json_part(path: &Path) -> Result<Vec<Map<String, Value>>> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))?;
    let Value::Array(items) = value else {
        bail!("{} is not a JSON array", path.display());
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(map),
            other => bail!("non-object element {other} in {}", path.display()),
        })
        .collect()
}

/// Sorted paths of the files in `dir` whose names end with `extension`.
///
/// # Errors
/// Returns an error if `dir` cannot be listed.
pub fn list_parts(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut parts = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("list {}", dir.display()))? {
        let path = entry?.path();
        if path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().ends_with(extension))
        {
            parts.push(path);
        }
    }
    parts.sort();
    Ok(parts)
}
