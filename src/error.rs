use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parse failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Invalid date '{value}': expected YYYY-MM-DD")]
    InvalidDate { value: String },

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidRange { start: String, end: String },

    #[error("Input file has no header row: {0}")]
    EmptyInput(String),

    #[error("Store error on table '{table}': {source}")]
    Store {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Table '{0}' does not exist")]
    UnknownTable(String),

    #[error("Duplicate primary key {key} in table '{table}'")]
    DuplicateKey { table: String, key: String },

    #[error("Row {row} of {context} has {found} values, expected {expected}")]
    RowWidth {
        context: String,
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Row {row} of table '{table}' has an invalid primary key: {reason}")]
    InvalidKey {
        table: String,
        row: usize,
        reason: String,
    },
}

impl EtlError {
    pub fn store(table: &str, source: rusqlite::Error) -> Self {
        EtlError::Store {
            table: table.to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
