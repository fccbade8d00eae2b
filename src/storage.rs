use crate::constants::*;
use crate::error::{EtlError, Result};
use crate::types::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// One table row, values in the table's column order
pub type Row = Vec<Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
    Date,
    Real,
}

impl ColumnType {
    pub fn sql(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Text => "TEXT",
            ColumnType::Date => "DATE",
            ColumnType::Real => "REAL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub column_type: ColumnType,
    pub primary_key: bool,
}

impl ColumnSpec {
    const fn new(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            primary_key: false,
        }
    }

    const fn key(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            primary_key: true,
        }
    }
}

/// Name and column layout of a target table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: Vec<ColumnSpec>,
}

impl TableSpec {
    pub fn employees() -> Self {
        Self {
            name: EMPLOYEES_TABLE,
            columns: vec![
                ColumnSpec::key(ID_COLUMN, ColumnType::Integer),
                ColumnSpec::new(NAME_COLUMN, ColumnType::Text),
                ColumnSpec::new(DATE_OF_BIRTH_COLUMN, ColumnType::Date),
                ColumnSpec::new(SALARY_COLUMN, ColumnType::Real),
                ColumnSpec::new(DEPARTMENT_ID_COLUMN, ColumnType::Integer),
            ],
        }
    }

    pub fn departments() -> Self {
        Self {
            name: DEPARTMENTS_TABLE,
            columns: vec![
                ColumnSpec::key(DEPARTMENT_ID_COLUMN, ColumnType::Integer),
                ColumnSpec::new(DEPARTMENT_NAME_COLUMN, ColumnType::Text),
            ],
        }
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    pub fn primary_key_index(&self) -> Option<usize> {
        self.columns.iter().position(|c| c.primary_key)
    }

    pub fn create_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let mut col = format!("\"{}\" {}", c.name, c.column_type.sql());
                if c.primary_key {
                    col.push_str(" PRIMARY KEY");
                }
                col
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE IF NOT EXISTS \"{}\" ({})", self.name, columns)
    }
}

fn key_of(table: &TableSpec, column: &ColumnSpec, row: usize, value: &Value) -> Result<String> {
    let invalid = |reason: String| EtlError::InvalidKey {
        table: table.name.to_string(),
        row,
        reason,
    };
    match (column.column_type, value) {
        (_, Value::Null) => Err(invalid(format!("{} is null", column.name))),
        (ColumnType::Integer, Value::Integer(i)) => Ok(i.to_string()),
        (ColumnType::Integer, Value::Float(x)) if x.fract() == 0.0 => Ok((*x as i64).to_string()),
        (ColumnType::Integer, other) => Err(invalid(format!(
            "{} value '{}' is not an integer",
            column.name, other
        ))),
        (_, other) => Ok(other.to_string()),
    }
}

/// Check `rows` fit `table` before anything is written: one value per
/// column, and a unique non-null primary key of the column's type.
pub fn validate_rows(table: &TableSpec, rows: &[Row]) -> Result<()> {
    let width = table.columns.len();
    if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
        return Err(EtlError::RowWidth {
            context: format!("table '{}'", table.name),
            row,
            expected: width,
            found: r.len(),
        });
    }

    let Some(pk) = table.primary_key_index() else {
        return Ok(());
    };
    let column = &table.columns[pk];
    let mut seen = HashSet::new();
    for (i, row) in rows.iter().enumerate() {
        let key = key_of(table, column, i, &row[pk])?;
        if !seen.insert(key.clone()) {
            return Err(EtlError::DuplicateKey {
                table: table.name.to_string(),
                key,
            });
        }
    }
    Ok(())
}

/// Relational store the load stage writes to
pub trait RelationalStore {
    /// Create the table if it does not exist yet.
    fn ensure_table(&mut self, table: &TableSpec) -> Result<()>;

    /// Delete every existing row of `table`, then write `rows`. Returns the
    /// number of rows written.
    fn replace_rows(&mut self, table: &TableSpec, rows: &[Row]) -> Result<usize>;
}

/// In-memory store for development/testing
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: HashMap<String, Vec<Row>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self, table: &str) -> Option<&[Row]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }
}

impl RelationalStore for InMemoryStore {
    fn ensure_table(&mut self, table: &TableSpec) -> Result<()> {
        self.tables.entry(table.name.to_string()).or_default();
        debug!("Ensured table {}", table.name);
        Ok(())
    }

    fn replace_rows(&mut self, table: &TableSpec, rows: &[Row]) -> Result<usize> {
        validate_rows(table, rows)?;

        let stored = self
            .tables
            .get_mut(table.name)
            .ok_or_else(|| EtlError::UnknownTable(table.name.to_string()))?;
        stored.clear();
        stored.extend_from_slice(rows);

        debug!("Replaced {} rows in {}", rows.len(), table.name);
        Ok(rows.len())
    }
}
