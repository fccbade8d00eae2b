use crate::constants::{DEPARTMENT_ID_COLUMN, DEPARTMENT_LABEL_PREFIX};
use crate::error::{EtlError, Result};
use crate::storage::{validate_rows, RelationalStore, Row, TableSpec};
use crate::types::{Dataset, Value};
use metrics::counter;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{error, info, instrument, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub departments_written: usize,
    pub employees_written: usize,
}

/// One `(department_id, "Dept_<id>")` row per distinct non-null
/// department id, in first-seen order.
pub fn derive_departments(dataset: &Dataset) -> Result<Vec<Row>> {
    let ids = dataset
        .column_values(DEPARTMENT_ID_COLUMN)
        .ok_or_else(|| EtlError::MissingColumn(DEPARTMENT_ID_COLUMN.to_string()))?;

    let mut seen = HashSet::new();
    let mut missing = 0;
    let mut departments = Vec::new();
    for id in ids {
        if id.is_null() {
            missing += 1;
            continue;
        }
        let key = id.to_string();
        if seen.insert(key.clone()) {
            departments.push(vec![
                id.clone(),
                Value::Text(format!("{DEPARTMENT_LABEL_PREFIX}{key}")),
            ]);
        }
    }

    if missing > 0 {
        warn!("{} rows have no {}, left out of departments", missing, DEPARTMENT_ID_COLUMN);
    }
    Ok(departments)
}

fn write_tables(store: &mut dyn RelationalStore, dataset: &Dataset) -> Result<LoadReport> {
    let employees_spec = TableSpec::employees();
    let departments_spec = TableSpec::departments();

    store.ensure_table(&employees_spec)?;
    store.ensure_table(&departments_spec)?;

    let departments = derive_departments(dataset)?;
    let employees = dataset.project(&employees_spec.column_names())?;
    validate_rows(&departments_spec, &departments)?;
    validate_rows(&employees_spec, &employees)?;

    let departments_written = store.replace_rows(&departments_spec, &departments)?;
    info!("Loaded {} rows into {}", departments_written, departments_spec.name);

    let employees_written = store.replace_rows(&employees_spec, &employees)?;
    info!("Loaded {} rows into {}", employees_written, employees_spec.name);

    Ok(LoadReport {
        departments_written,
        employees_written,
    })
}

/// Write the dataset to `employees` and a derived `departments` table,
/// replacing whatever both tables held before.
///
/// Both tables are checked first: a blank or non-integer `id` or
/// `department_id` key, or a repeated `id`, fails the load with nothing
/// written. A store failure while writing `employees` leaves the new
/// `departments` in place; the two tables are not written atomically
/// together.
#[instrument(skip(store, dataset), fields(rows = dataset.len()))]
pub fn load(store: &mut dyn RelationalStore, dataset: &Dataset) -> Result<LoadReport> {
    info!("Starting data load");
    match write_tables(store, dataset) {
        Ok(report) => {
            counter!("etl_rows_loaded_total", "table" => "departments").increment(report.departments_written as u64);
            counter!("etl_rows_loaded_total", "table" => "employees").increment(report.employees_written as u64);
            info!("Data load completed");
            Ok(report)
        }
        Err(e) => {
            error!("Error during data load: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DEPARTMENTS_TABLE, EMPLOYEES_TABLE};
    use crate::storage::InMemoryStore;

    fn employees(dept_ids: &[Value]) -> Dataset {
        let columns = ["id", "name", "date_of_birth", "salary", "department_id", "extra"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows = dept_ids
            .iter()
            .enumerate()
            .map(|(i, d)| {
                vec![
                    Value::Integer(i as i64 + 1),
                    Value::Text(format!("emp{i}")),
                    Value::Null,
                    Value::Float(1000.0),
                    d.clone(),
                    Value::Text("ignored".into()),
                ]
            })
            .collect();
        Dataset::new(columns, rows).unwrap()
    }

    #[test]
    fn one_department_per_distinct_id() {
        let ds = employees(&[
            Value::Integer(20),
            Value::Integer(10),
            Value::Integer(20),
            Value::Null,
            Value::Integer(10),
        ]);
        let departments = derive_departments(&ds).unwrap();
        assert_eq!(
            departments,
            vec![
                vec![Value::Integer(20), Value::Text("Dept_20".into())],
                vec![Value::Integer(10), Value::Text("Dept_10".into())],
            ]
        );
    }

    #[test]
    fn load_projects_employee_columns() {
        let ds = employees(&[Value::Integer(1), Value::Integer(1)]);
        let mut store = InMemoryStore::new();
        let report = load(&mut store, &ds).unwrap();

        assert_eq!(report, LoadReport { departments_written: 1, employees_written: 2 });
        let rows = store.rows(EMPLOYEES_TABLE).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 5);
        assert_eq!(rows[1][0], Value::Integer(2));
        assert_eq!(store.rows(DEPARTMENTS_TABLE).unwrap().len(), 1);
    }

    #[test]
    fn missing_column_fails_before_writing() {
        let ds = Dataset::new(
            vec!["id".into(), "department_id".into()],
            vec![vec![Value::Integer(1), Value::Integer(3)]],
        )
        .unwrap();
        let mut store = InMemoryStore::new();
        let err = load(&mut store, &ds).unwrap_err();

        assert!(matches!(err, EtlError::MissingColumn(c) if c == "name"));
        assert_eq!(store.rows(DEPARTMENTS_TABLE), Some(&[][..]));
        assert_eq!(store.rows(EMPLOYEES_TABLE), Some(&[][..]));
    }

    #[test]
    fn duplicate_employee_id_writes_nothing() {
        let mut ds = employees(&[Value::Integer(1), Value::Integer(2)]);
        ds = Dataset::new(
            ds.columns().to_vec(),
            ds.rows()
                .iter()
                .map(|r| {
                    let mut r = r.clone();
                    r[0] = Value::Integer(9);
                    r
                })
                .collect(),
        )
        .unwrap();
        let mut store = InMemoryStore::new();
        assert!(matches!(load(&mut store, &ds), Err(EtlError::DuplicateKey { .. })));
        assert!(store.rows(DEPARTMENTS_TABLE).unwrap().is_empty());
        assert!(store.rows(EMPLOYEES_TABLE).unwrap().is_empty());
    }

    #[test]
    fn blank_id_writes_nothing() {
        let ds = employees(&[Value::Integer(1), Value::Integer(2)]);
        let rows = ds
            .rows()
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let mut r = r.clone();
                if i == 1 {
                    r[0] = Value::Null;
                }
                r
            })
            .collect();
        let ds = Dataset::new(ds.columns().to_vec(), rows).unwrap();

        let mut store = InMemoryStore::new();
        let err = load(&mut store, &ds).unwrap_err();
        assert!(matches!(err, EtlError::InvalidKey { ref table, row: 1, .. } if table == "employees"));
        assert!(store.rows(DEPARTMENTS_TABLE).unwrap().is_empty());
        assert!(store.rows(EMPLOYEES_TABLE).unwrap().is_empty());
    }

    #[test]
    fn text_department_id_writes_nothing() {
        let ds = employees(&[Value::Text("D10".into())]);
        let mut store = InMemoryStore::new();
        let err = load(&mut store, &ds).unwrap_err();
        assert!(matches!(err, EtlError::InvalidKey { ref table, .. } if table == "departments"));
        assert!(store.rows(EMPLOYEES_TABLE).unwrap().is_empty());
    }
}
