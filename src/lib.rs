pub mod aggregate;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod storage;
pub mod telemetry;
pub mod types;

pub use error::{EtlError, Result};
