use crate::constants::{DATE_OF_BIRTH_COLUMN, DATE_OF_BIRTH_FORMATS, SALARY_COLUMN, TIMESTAMP_FORMATS};
use crate::types::{Dataset, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use metrics::counter;
use serde::Serialize;
use tracing::{info, instrument, warn};

/// How many values each coercion replaced with `Value::Null`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransformReport {
    pub dates_nulled: usize,
    pub salaries_nulled: usize,
}

/// Parse a date of birth in any accepted format. Timestamps keep their
/// calendar date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_OF_BIRTH_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            TIMESTAMP_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Parse a finite number, ignoring surrounding whitespace.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|x| x.is_finite())
}

fn coerce_date(value: &Value) -> Value {
    match value {
        Value::Date(_) | Value::Null => value.clone(),
        Value::Text(s) => parse_date(s).map(Value::Date).unwrap_or(Value::Null),
        Value::Integer(_) | Value::Float(_) => Value::Null,
    }
}

fn coerce_number(value: &Value) -> Value {
    match value {
        Value::Float(x) if x.is_finite() => value.clone(),
        Value::Integer(i) => Value::Float(*i as f64),
        Value::Text(s) => parse_number(s).map(Value::Float).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// Coerce every value of `column` in place, counting new nulls. Returns
/// None when the column is absent.
fn coerce_column(dataset: &mut Dataset, column: &str, coerce: fn(&Value) -> Value) -> Option<usize> {
    let mut nulled = 0;
    let found = dataset.map_column(column, |value| {
        let coerced = coerce(value);
        if coerced.is_null() && !value.is_null() {
            nulled += 1;
        }
        *value = coerced;
    });
    found.then_some(nulled)
}

/// Clean column labels and coerce `date_of_birth` and `salary`.
///
/// Coercion is row-local: a value that cannot be read becomes
/// `Value::Null` and the row is kept. A missing column is logged and
/// skipped. Running the transform again on its own output changes nothing.
#[instrument(skip(dataset), fields(rows = dataset.len()))]
pub fn transform_with_report(mut dataset: Dataset) -> (Dataset, TransformReport) {
    info!("Starting data transformation");
    let mut report = TransformReport::default();

    for label in dataset.columns_mut() {
        *label = label.trim().to_string();
    }

    match coerce_column(&mut dataset, DATE_OF_BIRTH_COLUMN, coerce_date) {
        Some(n) => report.dates_nulled = n,
        None => warn!("Column {} not found, skipping date coercion", DATE_OF_BIRTH_COLUMN),
    }

    match coerce_column(&mut dataset, SALARY_COLUMN, coerce_number) {
        Some(n) => report.salaries_nulled = n,
        None => warn!("Column {} not found, skipping salary coercion", SALARY_COLUMN),
    }

    counter!("etl_values_nulled_total", "column" => DATE_OF_BIRTH_COLUMN).increment(report.dates_nulled as u64);
    counter!("etl_values_nulled_total", "column" => SALARY_COLUMN).increment(report.salaries_nulled as u64);
    info!(
        "Transformation complete: {} dates and {} salaries set to null",
        report.dates_nulled, report.salaries_nulled
    );
    (dataset, report)
}

pub fn transform(dataset: Dataset) -> Dataset {
    transform_with_report(dataset).0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> Dataset {
        Dataset::new(
            vec![" id".into(), "name ".into(), " date_of_birth ".into(), "salary".into()],
            vec![
                vec![
                    Value::Integer(1),
                    Value::Text(" Ann ".into()),
                    Value::Text("1990-01-02".into()),
                    Value::Integer(50000),
                ],
                vec![
                    Value::Integer(2),
                    Value::Text("Bob".into()),
                    Value::Text("02/29/1991".into()),
                    Value::Text("N/A".into()),
                ],
                vec![
                    Value::Integer(3),
                    Value::Text("Cy".into()),
                    Value::Text("1985-07-30T08:15:00Z".into()),
                    Value::Float(1234.5),
                ],
            ],
        )
        .unwrap()
    }

    #[test]
    fn labels_are_trimmed_values_untouched() {
        let ds = transform(dataset());
        assert_eq!(ds.columns(), &["id", "name", "date_of_birth", "salary"]);
        assert_eq!(ds.get(0, "name"), Some(&Value::Text(" Ann ".into())));
    }

    #[test]
    fn unreadable_values_become_null_and_rows_survive() {
        let (ds, report) = transform_with_report(dataset());
        assert_eq!(ds.len(), 3);

        assert_eq!(
            ds.get(0, "date_of_birth"),
            Some(&Value::Date(NaiveDate::from_ymd_opt(1990, 1, 2).unwrap()))
        );
        // 1991 is not a leap year
        assert_eq!(ds.get(1, "date_of_birth"), Some(&Value::Null));
        assert_eq!(
            ds.get(2, "date_of_birth"),
            Some(&Value::Date(NaiveDate::from_ymd_opt(1985, 7, 30).unwrap()))
        );

        assert_eq!(ds.get(0, "salary"), Some(&Value::Float(50000.0)));
        assert_eq!(ds.get(1, "salary"), Some(&Value::Null));
        assert_eq!(ds.get(2, "salary"), Some(&Value::Float(1234.5)));

        assert_eq!(report, TransformReport { dates_nulled: 1, salaries_nulled: 1 });
    }

    #[test]
    fn transform_is_idempotent() {
        let once = transform(dataset());
        let (twice, report) = transform_with_report(once.clone());
        assert_eq!(once, twice);
        assert_eq!(report, TransformReport::default());
    }

    #[test]
    fn missing_columns_are_skipped() {
        let ds = Dataset::new(vec!["id".into()], vec![vec![Value::Integer(1)]]).unwrap();
        let (out, report) = transform_with_report(ds.clone());
        assert_eq!(out, ds);
        assert_eq!(report, TransformReport::default());
    }

    #[test]
    fn parse_helpers() {
        assert_eq!(parse_date(" 2001/12/03 "), NaiveDate::from_ymd_opt(2001, 12, 3));
        assert_eq!(parse_date("03.12.2001"), NaiveDate::from_ymd_opt(2001, 12, 3));
        assert_eq!(parse_date("2001-12-03 10:00:00"), NaiveDate::from_ymd_opt(2001, 12, 3));
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_number(" 42 "), Some(42.0));
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("1,000"), None);
    }
}
