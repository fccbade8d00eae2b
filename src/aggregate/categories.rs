use super::{normalize_category, scan_rows};
use crate::constants::{BREED_COLUMN, LICENSE_TYPE_COLUMN};
use crate::error::Result;
use metrics::counter;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{error, info, instrument};

/// Normalized breed -> trimmed licence type -> number of licences.
/// Only combinations that occur are present, so every count is at least 1.
pub type LicenseCounts = BTreeMap<String, BTreeMap<String, u64>>;

/// Distinct normalized breeds in the file.
#[instrument(skip(path), fields(path = %path.display()))]
pub fn unique_breeds(path: &Path) -> Result<BTreeSet<String>> {
    info!("Extracting unique normalized breeds");
    let mut breeds = BTreeSet::new();

    let scanned = scan_rows(path, &[BREED_COLUMN], |row| {
        breeds.insert(normalize_category(row.field(0)));
        Ok(())
    });

    match scanned {
        Ok(rows) => {
            counter!("licence_rows_scanned_total", "operation" => "unique_breeds").increment(rows as u64);
            info!("Extracted {} unique breeds from {} rows", breeds.len(), rows);
            Ok(breeds)
        }
        Err(e) => {
            error!("Error extracting unique breeds: {}", e);
            Err(e)
        }
    }
}

/// Licence counts grouped by normalized breed, then licence type.
#[instrument(skip(path), fields(path = %path.display()))]
pub fn license_counts(path: &Path) -> Result<LicenseCounts> {
    info!("Counting licences by breed and licence type");
    let mut counts = LicenseCounts::new();

    let scanned = scan_rows(path, &[BREED_COLUMN, LICENSE_TYPE_COLUMN], |row| {
        let breed = normalize_category(row.field(0));
        let license_type = row.field(1).trim().to_string();
        *counts
            .entry(breed)
            .or_default()
            .entry(license_type)
            .or_insert(0) += 1;
        Ok(())
    });

    match scanned {
        Ok(rows) => {
            counter!("licence_rows_scanned_total", "operation" => "license_counts").increment(rows as u64);
            info!("Counted licences for {} breeds", counts.len());
            Ok(counts)
        }
        Err(e) => {
            error!("Error counting licences by breed and licence type: {}", e);
            Err(e)
        }
    }
}
