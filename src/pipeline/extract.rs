use crate::constants::NA_TOKENS;
use crate::error::{EtlError, Result};
use crate::types::{Dataset, Value};
use csv::{ReaderBuilder, StringRecord};
use metrics::counter;
use std::fs::File;
use std::path::Path;
use tracing::{error, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Integer,
    Float,
    Text,
}

fn is_missing(cell: &str) -> bool {
    let cell = cell.trim();
    cell.is_empty() || NA_TOKENS.contains(&cell)
}

fn infer_kind<'a, I>(cells: I) -> ColumnKind
where
    I: Iterator<Item = &'a str>,
{
    let mut kind = ColumnKind::Integer;
    for cell in cells.filter(|c| !is_missing(c)) {
        let cell = cell.trim();
        if kind == ColumnKind::Integer && cell.parse::<i64>().is_err() {
            kind = ColumnKind::Float;
        }
        if kind == ColumnKind::Float && !cell.parse::<f64>().map(f64::is_finite).unwrap_or(false) {
            return ColumnKind::Text;
        }
    }
    kind
}

fn to_value(cell: &str, kind: ColumnKind) -> Value {
    if is_missing(cell) {
        return Value::Null;
    }
    // infer_kind has already checked every non-missing cell parses
    match kind {
        ColumnKind::Integer => cell.trim().parse().map(Value::Integer).unwrap_or(Value::Null),
        ColumnKind::Float => cell.trim().parse().map(Value::Float).unwrap_or(Value::Null),
        ColumnKind::Text => Value::Text(cell.to_string()),
    }
}

fn read_dataset(path: &Path) -> Result<Dataset> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(EtlError::EmptyInput(path.display().to_string()));
    }

    let records = reader.records().collect::<std::result::Result<Vec<StringRecord>, _>>()?;

    let kinds: Vec<ColumnKind> = (0..headers.len())
        .map(|i| infer_kind(records.iter().map(|r| r.get(i).unwrap_or(""))))
        .collect();

    let rows = records
        .iter()
        .map(|r| {
            kinds
                .iter()
                .enumerate()
                .map(|(i, &kind)| to_value(r.get(i).unwrap_or(""), kind))
                .collect()
        })
        .collect();

    let columns = headers.iter().map(str::to_string).collect();
    Dataset::new(columns, rows)
}

/// Read a whole employee CSV into a typed dataset. Column types are
/// inferred from content: all-integer, all-numeric, otherwise text.
/// Empty and NA-like cells become `Value::Null`.
#[instrument(skip(path), fields(path = %path.display()))]
pub fn extract(path: &Path) -> Result<Dataset> {
    info!("Extracting data from {}", path.display());
    match read_dataset(path) {
        Ok(dataset) => {
            counter!("etl_rows_extracted_total").increment(dataset.len() as u64);
            info!(
                "Extracted {} rows across {} columns",
                dataset.len(),
                dataset.columns().len()
            );
            Ok(dataset)
        }
        Err(e) => {
            error!("Error extracting {}: {}", path.display(), e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn infers_column_types() {
        let f = csv_file(
            "id, name ,salary,date_of_birth,department_id\n\
             1,Ann,50000,1990-01-02,10\n\
             2,Bob,61000.5,bad,10\n\
             3,Cy,,1985-07-30,\n",
        );
        let ds = extract(f.path()).unwrap();

        assert_eq!(ds.columns(), &["id", " name ", "salary", "date_of_birth", "department_id"]);
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.get(0, "id"), Some(&Value::Integer(1)));
        assert_eq!(ds.get(0, "salary"), Some(&Value::Float(50000.0)));
        assert_eq!(ds.get(1, "salary"), Some(&Value::Float(61000.5)));
        assert_eq!(ds.get(2, "salary"), Some(&Value::Null));
        assert_eq!(ds.get(1, "date_of_birth"), Some(&Value::Text("bad".into())));
        assert_eq!(ds.get(2, "department_id"), Some(&Value::Null));
    }

    #[test]
    fn na_tokens_are_null() {
        let f = csv_file("id,salary\n1,N/A\n2,70000\n3,NaN\n");
        let ds = extract(f.path()).unwrap();
        let salaries: Vec<_> = ds.column_values("salary").unwrap().cloned().collect();
        assert_eq!(salaries, vec![Value::Null, Value::Integer(70000), Value::Null]);
    }

    #[test]
    fn mixed_column_stays_text() {
        let f = csv_file("salary\n100\nabc\n");
        let ds = extract(f.path()).unwrap();
        assert_eq!(ds.get(0, "salary"), Some(&Value::Text("100".into())));
    }

    #[test]
    fn empty_file_is_an_error() {
        let f = csv_file("");
        assert!(matches!(extract(f.path()), Err(EtlError::EmptyInput(_))));
    }

    #[test]
    fn ragged_rows_are_an_error() {
        let f = csv_file("id,name\n1,Ann,extra\n");
        assert!(matches!(extract(f.path()), Err(EtlError::Csv(_))));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(matches!(
            extract(Path::new("/no/such/flat_file.csv")),
            Err(EtlError::Io(_))
        ));
    }
}
