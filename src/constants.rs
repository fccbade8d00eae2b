//! Column and table names shared by the aggregation and ETL pipelines.

// Licence file columns
pub const BREED_COLUMN: &str = "Breed";
pub const LICENSE_TYPE_COLUMN: &str = "LicenseType";
pub const DOG_NAME_COLUMN: &str = "DogName";
pub const VALID_DATE_COLUMN: &str = "ValidDate";

// Employee file columns
pub const ID_COLUMN: &str = "id";
pub const NAME_COLUMN: &str = "name";
pub const DATE_OF_BIRTH_COLUMN: &str = "date_of_birth";
pub const SALARY_COLUMN: &str = "salary";
pub const DEPARTMENT_ID_COLUMN: &str = "department_id";
pub const DEPARTMENT_NAME_COLUMN: &str = "department_name";

// Target tables
pub const EMPLOYEES_TABLE: &str = "employees";
pub const DEPARTMENTS_TABLE: &str = "departments";

/// Prefix for synthesized department labels
pub const DEPARTMENT_LABEL_PREFIX: &str = "Dept_";

/// Date format for `ValidDate` and the range bounds
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Formats accepted when coercing `date_of_birth`, tried in order
pub const DATE_OF_BIRTH_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Timestamp formats whose date part is kept when coercing `date_of_birth`
pub const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Cell contents read as missing when extracting a dataset
pub const NA_TOKENS: &[&str] = &["NA", "N/A", "n/a", "NaN", "nan", "null", "NULL", "None", "#N/A"];

pub const DEFAULT_TOP_K: usize = 5;

// Defaults for the CLI when no config file is present
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const DEFAULT_LICENSE_INPUT: &str = "data/2017.csv";
pub const DEFAULT_EMPLOYEE_INPUT: &str = "flat_file.csv";
pub const DEFAULT_DATABASE_PATH: &str = "etl.db";
pub const DEFAULT_RANGE_START: &str = "2017-07-01";
pub const DEFAULT_RANGE_END: &str = "2017-12-31";

// Environment overrides
pub const DATABASE_ENV_VAR: &str = "LICENCE_ETL_DATABASE";
pub const METRICS_PORT_ENV_VAR: &str = "LICENCE_ETL_METRICS_PORT";
