use super::scan_rows;
use crate::constants::{ISO_DATE_FORMAT, VALID_DATE_COLUMN};
use crate::error::{EtlError, Result};
use crate::types::Record;
use chrono::NaiveDate;
use metrics::counter;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};

/// Parse a `YYYY-MM-DD` date, ignoring surrounding whitespace.
pub fn parse_iso_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), ISO_DATE_FORMAT).map_err(|_| EtlError::InvalidDate {
        value: value.to_string(),
    })
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Rows whose `ValidDate` fell inside a range, in input order, plus how
/// many rows were dropped because their date could not be read.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DateRangeSelection {
    pub rows: Vec<Record>,
    pub skipped: usize,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(EtlError::InvalidRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_iso_date(start)?, parse_iso_date(end)?)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    fn accept(&self, record: Record, selection: &mut DateRangeSelection) {
        match record.get(VALID_DATE_COLUMN).map(|v| parse_iso_date(v)) {
            Some(Ok(date)) => {
                if self.contains(date) {
                    selection.rows.push(record);
                }
            }
            Some(Err(e)) => {
                warn!("Skipping row with unreadable {}: {}", VALID_DATE_COLUMN, e);
                selection.skipped += 1;
            }
            None => {
                warn!("Skipping row without {}", VALID_DATE_COLUMN);
                selection.skipped += 1;
            }
        }
    }

    /// Keep the records dated inside the range. Order is preserved, and
    /// filtering an already filtered set returns it unchanged.
    pub fn filter<I>(&self, records: I) -> DateRangeSelection
    where
        I: IntoIterator<Item = Record>,
    {
        let mut selection = DateRangeSelection::default();
        for record in records {
            self.accept(record, &mut selection);
        }
        selection
    }

    /// Scan a licence file and keep the rows dated inside the range.
    #[instrument(skip(self, path), fields(path = %path.display(), start = %self.start, end = %self.end))]
    pub fn filter_file(&self, path: &Path) -> Result<DateRangeSelection> {
        info!("Filtering licences issued between {} and {}", self.start, self.end);
        let mut selection = DateRangeSelection::default();

        let scanned = scan_rows(path, &[VALID_DATE_COLUMN], |row| {
            self.accept(row.to_record(), &mut selection);
            Ok(())
        });

        match scanned {
            Ok(rows) => {
                counter!("licence_rows_scanned_total", "operation" => "date_range").increment(rows as u64);
                counter!("licence_rows_skipped_total", "operation" => "date_range")
                    .increment(selection.skipped as u64);
                if selection.skipped > 0 {
                    warn!("{} rows skipped for unreadable dates", selection.skipped);
                }
                info!("Filtered {} of {} licences within the date range", selection.rows.len(), rows);
                Ok(selection)
            }
            Err(e) => {
                error!("Error filtering licences by date: {}", e);
                Err(e)
            }
        }
    }
}

/// Parse the bounds, then filter `path`. Malformed or reversed bounds fail
/// before the file is opened.
pub fn filter_by_date_range(path: &Path, start: &str, end: &str) -> Result<DateRangeSelection> {
    let range = DateRange::parse(start, end).map_err(|e| {
        error!("Rejected date range {}..{}: {}", start, end, e);
        e
    })?;
    debug!(?range, "Parsed date range");
    range.filter_file(path)
}
