use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::warn;

use crate::fields::FieldMap;

/// Load business rows from a CSV file, one FieldMap per data row.
pub fn load_rows(path: &Path, limit: Option<usize>) -> Result<Vec<FieldMap>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_rows(file, limit).with_context(|| format!("reading {}", path.display()))
}

/// Headers become field names: trimmed, lowercased, spaces to underscores.
/// Duplicate headers warn and the later column wins. A row whose field
/// count disagrees with the header is a hard error, the file is no longer
/// a flat mapping at that point.
pub fn read_rows<R: Read>(input: R, limit: Option<usize>) -> Result<Vec<FieldMap>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader.headers().context("reading header row")?.clone();
    if headers.is_empty() {
        bail!("empty header row");
    }

    let mut names = Vec::with_capacity(headers.len());
    let mut seen = HashSet::new();
    for (idx, raw) in headers.iter().enumerate() {
        let name = raw.trim().to_lowercase().replace(' ', "_");
        if name.is_empty() {
            bail!("header column {} has no name", idx + 1);
        }
        if !seen.insert(name.clone()) {
            warn!(column = %name, "duplicate header, later column wins");
        }
        names.push(name);
    }

    let max = limit.unwrap_or(usize::MAX);
    let mut rows = Vec::new();
    for (idx, record) in reader.records().take(max).enumerate() {
        let record = record.with_context(|| format!("row {}", idx + 2))?;
        let mut fields = FieldMap::new();
        for (name, value) in names.iter().zip(record.iter()) {
            fields.insert(name, value);
        }
        rows.push(fields);
    }
    Ok(rows)
}
