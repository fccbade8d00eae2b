use crate::constants::ISO_DATE_FORMAT;
use crate::error::{EtlError, Result};
use crate::storage::{validate_rows, RelationalStore, Row, TableSpec};
use crate::types::Value;
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use std::path::Path;
use tracing::{debug, info};

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Float(x) => ToSqlOutput::Owned(SqlValue::Real(*x)),
            Value::Date(d) => ToSqlOutput::Owned(SqlValue::Text(d.format(ISO_DATE_FORMAT).to_string())),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(x) => Value::Float(x),
        ValueRef::Text(t) | ValueRef::Blob(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
    }
}

/// SQLite-backed store. Each table replacement runs in its own transaction.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file, creating its parent directory.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        info!("Opening SQLite store at {}", db_path.display());
        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// All rows of `table` in insertion order.
    pub fn fetch_rows(&self, table: &TableSpec) -> Result<Vec<Row>> {
        let columns = table
            .column_names()
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {} FROM \"{}\" ORDER BY rowid", columns, table.name);
        let width = table.columns.len();

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| EtlError::store(table.name, e))?;
        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(from_sql))
                    .collect::<rusqlite::Result<Row>>()
            })
            .map_err(|e| EtlError::store(table.name, e))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| EtlError::store(table.name, e))
    }
}

impl RelationalStore for SqliteStore {
    fn ensure_table(&mut self, table: &TableSpec) -> Result<()> {
        self.conn
            .execute(&table.create_sql(), [])
            .map_err(|e| EtlError::store(table.name, e))?;
        debug!("Ensured table {}", table.name);
        Ok(())
    }

    fn replace_rows(&mut self, table: &TableSpec, rows: &[Row]) -> Result<usize> {
        // A NULL into an INTEGER PRIMARY KEY would be given a fresh rowid
        validate_rows(table, rows)?;

        let store_err = |e| EtlError::store(table.name, e);
        let tx = self.conn.transaction().map_err(store_err)?;

        let removed = tx
            .execute(&format!("DELETE FROM \"{}\"", table.name), [])
            .map_err(store_err)?;

        let placeholders = vec!["?"; table.columns.len()].join(", ");
        let columns = table
            .column_names()
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("INSERT INTO \"{}\" ({}) VALUES ({})", table.name, columns, placeholders);

        {
            let mut stmt = tx.prepare(&sql).map_err(store_err)?;
            for row in rows {
                stmt.execute(params_from_iter(row.iter())).map_err(store_err)?;
            }
        }
        tx.commit().map_err(store_err)?;

        debug!("Replaced {} rows in {} ({} removed)", rows.len(), table.name, removed);
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn employee(id: i64, dept: i64) -> Row {
        vec![
            Value::Integer(id),
            Value::Text(format!("emp{id}")),
            Value::Date(NaiveDate::from_ymd_opt(1990, 5, 17).unwrap()),
            Value::Null,
            Value::Integer(dept),
        ]
    }

    #[test]
    fn replace_rows_is_destructive() {
        let spec = TableSpec::employees();
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.ensure_table(&spec).unwrap();
        store.ensure_table(&spec).unwrap();

        store.replace_rows(&spec, &[employee(1, 10), employee(2, 10)]).unwrap();
        store.replace_rows(&spec, &[employee(3, 20)]).unwrap();

        let rows = store.fetch_rows(&spec).unwrap();
        assert_eq!(rows, vec![vec![
            Value::Integer(3),
            Value::Text("emp3".into()),
            Value::Text("1990-05-17".into()),
            Value::Null,
            Value::Integer(20),
        ]]);
    }

    #[test]
    fn duplicate_primary_key_leaves_the_table_alone() {
        let spec = TableSpec::employees();
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.ensure_table(&spec).unwrap();
        store.replace_rows(&spec, &[employee(1, 10)]).unwrap();

        let err = store
            .replace_rows(&spec, &[employee(5, 10), employee(5, 10)])
            .unwrap_err();
        assert!(matches!(err, EtlError::DuplicateKey { ref table, .. } if table == "employees"));

        let rows = store.fetch_rows(&spec).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], Value::Integer(1));
    }

    #[test]
    fn replace_without_table_fails() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let err = store.replace_rows(&TableSpec::departments(), &[]).unwrap_err();
        assert!(matches!(err, EtlError::Store { .. }));
    }

    #[test]
    fn blank_id_is_rejected_not_renumbered() {
        let spec = TableSpec::employees();
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.ensure_table(&spec).unwrap();
        store.replace_rows(&spec, &[employee(1, 10)]).unwrap();

        let mut blank = employee(2, 10);
        blank[0] = Value::Null;
        let err = store.replace_rows(&spec, &[employee(3, 10), blank]).unwrap_err();
        assert!(matches!(err, EtlError::InvalidKey { row: 1, .. }));

        let rows = store.fetch_rows(&spec).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], Value::Integer(1));
    }

    #[test]
    fn text_department_id_is_rejected() {
        let spec = TableSpec::departments();
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.ensure_table(&spec).unwrap();

        let err = store
            .replace_rows(&spec, &[vec![Value::Text("D10".into()), Value::Text("Dept_D10".into())]])
            .unwrap_err();
        assert!(matches!(err, EtlError::InvalidKey { ref table, .. } if table == "departments"));
        assert!(store.fetch_rows(&spec).unwrap().is_empty());
    }

    #[test]
    fn short_row_is_rejected() {
        let spec = TableSpec::employees();
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.ensure_table(&spec).unwrap();

        let err = store.replace_rows(&spec, &[vec![Value::Integer(1), Value::Null]]).unwrap_err();
        assert!(matches!(err, EtlError::RowWidth { expected: 5, found: 2, .. }));
    }
}
