//! Single-pass statistics over a dog licence CSV.
//!
//! Every operation opens the file, scans it once and closes it. Failures
//! (missing file, missing column, malformed CSV) are logged and returned as
//! errors; a header-only or zero-byte file is a valid, empty input.

mod categories;
mod date_range;
mod frequency;

pub use categories::{license_counts, unique_breeds, LicenseCounts};
pub use date_range::{filter_by_date_range, parse_iso_date, DateRange, DateRangeSelection};
pub use frequency::{top_names, FrequencyCounter, NameCount};

use crate::error::{EtlError, Result};
use crate::types::Record;
use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;
use tracing::{info, instrument};

/// Trim, drop all internal whitespace, lowercase.
pub fn normalize_category(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Trim and lowercase, keeping internal spaces.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// A data row seen through the columns an operation asked for.
pub(crate) struct Row<'a> {
    headers: &'a StringRecord,
    record: &'a StringRecord,
    indices: &'a [usize],
}

impl Row<'_> {
    /// The n-th requested column of this row.
    pub(crate) fn field(&self, n: usize) -> &str {
        self.record.get(self.indices[n]).unwrap_or("")
    }

    pub(crate) fn to_record(&self) -> Record {
        self.headers
            .iter()
            .zip(self.record.iter())
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect()
    }
}

/// Stream every data row of `path` to `visit`, resolving `columns` against
/// the header first. Returns the number of rows visited.
pub(crate) fn scan_rows<F>(path: &Path, columns: &[&str], mut visit: F) -> Result<usize>
where
    F: FnMut(&Row<'_>) -> Result<()>,
{
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);
    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Ok(0);
    }

    let indices = columns
        .iter()
        .map(|c| {
            headers
                .iter()
                .position(|h| h == *c)
                .ok_or_else(|| EtlError::MissingColumn(c.to_string()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut rows = 0;
    let mut record = StringRecord::new();
    while reader.read_record(&mut record)? {
        visit(&Row {
            headers: &headers,
            record: &record,
            indices: &indices,
        })?;
        rows += 1;
    }
    Ok(rows)
}

/// All four licence statistics for one file
#[derive(Debug, Clone, Serialize)]
pub struct LicenseSummary {
    pub unique_breeds: BTreeSet<String>,
    pub license_counts: LicenseCounts,
    pub top_names: Vec<NameCount>,
    pub date_range: DateRange,
    pub licenses_in_range: DateRangeSelection,
}

/// Run every licence statistic against `path`. Each one is an independent
/// scan; the first failure aborts the summary.
#[instrument(skip(path, range), fields(path = %path.display()))]
pub fn summarize(path: &Path, top_k: usize, range: DateRange) -> Result<LicenseSummary> {
    let summary = LicenseSummary {
        unique_breeds: unique_breeds(path)?,
        license_counts: license_counts(path)?,
        top_names: top_names(path, top_k)?,
        licenses_in_range: range.filter_file(path)?,
        date_range: range,
    };
    info!("Licence summary complete");
    Ok(summary)
}
