//! Employee ETL: extract a CSV, coerce its fields, load it into a
//! relational store.

pub mod extract;
pub mod load;
pub mod transform;

pub use extract::extract;
pub use load::{derive_departments, load, LoadReport};
pub use transform::{transform, transform_with_report, TransformReport};

use crate::error::Result;
use crate::storage::RelationalStore;
use serde::Serialize;
use std::path::Path;
use tracing::{error, info, info_span};
use uuid::Uuid;

/// Result of a complete ETL run
#[derive(Debug, Clone, Serialize)]
pub struct EtlReport {
    pub run_id: Uuid,
    pub rows_extracted: usize,
    pub transform: TransformReport,
    pub load: LoadReport,
}

fn run_stages(run_id: Uuid, path: &Path, store: &mut dyn RelationalStore) -> Result<EtlReport> {
    let raw = extract(path)?;
    let rows_extracted = raw.len();
    let (dataset, transformed) = transform_with_report(raw);
    let loaded = load(store, &dataset)?;
    Ok(EtlReport {
        run_id,
        rows_extracted,
        transform: transformed,
        load: loaded,
    })
}

/// Run extract, transform and load against `store`. Stops at the first
/// stage that fails.
pub fn run_etl(path: &Path, store: &mut dyn RelationalStore) -> Result<EtlReport> {
    let run_id = Uuid::new_v4();
    let span = info_span!("etl_run", %run_id);
    let _enter = span.enter();

    info!("ETL process started for {}", path.display());
    let result = run_stages(run_id, path, store);

    match &result {
        Ok(report) => info!(
            "ETL process completed: {} rows extracted, {} employees and {} departments loaded",
            report.rows_extracted, report.load.employees_written, report.load.departments_written
        ),
        Err(e) => error!("ETL process failed: {}", e),
    }
    result
}
