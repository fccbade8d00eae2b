use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use licence_etl::aggregate::{self, DateRange};
use licence_etl::config::Config;
use licence_etl::db::SqliteStore;
use licence_etl::{logging, pipeline, telemetry};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "licence_etl")]
#[command(about = "Dog licence statistics and employee ETL")]
#[command(version = "0.1.0")]
struct Cli {
    /// Config file (defaults to ./config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List unique normalized breeds
    Breeds {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Count licences by breed and licence type
    Licenses {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Show the most popular dog names
    TopNames {
        #[arg(long)]
        input: Option<PathBuf>,
        /// How many names to show
        #[arg(long)]
        k: Option<usize>,
    },
    /// List licences whose ValidDate falls in an inclusive range
    DateRange {
        #[arg(long)]
        input: Option<PathBuf>,
        /// Start date, YYYY-MM-DD
        #[arg(long)]
        start: Option<String>,
        /// End date, YYYY-MM-DD
        #[arg(long)]
        end: Option<String>,
    },
    /// Run every licence statistic
    Report {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Extract, transform and load the employee file
    Etl {
        #[arg(long)]
        input: Option<PathBuf>,
        /// SQLite database file
        #[arg(long)]
        database: Option<PathBuf>,
    },
}

fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human(value);
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::resolve(cli.config.as_deref()).context("loading configuration")?;
    let json = cli.json;

    match cli.command {
        Commands::Breeds { input } => {
            let path = input.unwrap_or(config.aggregate.input);
            let breeds = aggregate::unique_breeds(&path)?;
            emit(json, &breeds, |b| {
                println!("Unique breeds ({}):", b.len());
                for breed in b {
                    println!("  {breed}");
                }
            })?;
        }
        Commands::Licenses { input } => {
            let path = input.unwrap_or(config.aggregate.input);
            let counts = aggregate::license_counts(&path)?;
            emit(json, &counts, |c| {
                println!("Licences by breed and licence type:");
                for (breed, types) in c {
                    println!("  {breed}");
                    for (license_type, n) in types {
                        println!("    {license_type}: {n}");
                    }
                }
            })?;
        }
        Commands::TopNames { input, k } => {
            let path = input.unwrap_or(config.aggregate.input);
            let k = k.unwrap_or(config.aggregate.top_k);
            let top = aggregate::top_names(&path, k)?;
            emit(json, &top, |t| {
                println!("Top {k} dog names:");
                for entry in t {
                    println!("  {}: {}", entry.name, entry.count);
                }
            })?;
        }
        Commands::DateRange { input, start, end } => {
            let path = input.unwrap_or(config.aggregate.input);
            let start = start.unwrap_or(config.aggregate.start_date);
            let end = end.unwrap_or(config.aggregate.end_date);
            let selection = aggregate::filter_by_date_range(&path, &start, &end)?;
            emit(json, &selection, |s| {
                println!("Licences issued between {start} and {end}: {}", s.rows.len());
                for row in &s.rows {
                    let fields: Vec<String> = row.iter().map(|(k, v)| format!("{k}={v}")).collect();
                    println!("  {}", fields.join(", "));
                }
                if s.skipped > 0 {
                    println!("Skipped {} rows with unreadable dates", s.skipped);
                }
            })?;
        }
        Commands::Report { input } => {
            let range: DateRange = config.date_range().context("invalid date range in configuration")?;
            let path = input.unwrap_or(config.aggregate.input);
            let summary = aggregate::summarize(&path, config.aggregate.top_k, range)?;
            emit(json, &summary, |s| {
                println!("Unique breeds: {}", s.unique_breeds.len());
                println!("Breeds with licence counts: {}", s.license_counts.len());
                println!("Top dog names:");
                for entry in &s.top_names {
                    println!("  {}: {}", entry.name, entry.count);
                }
                println!(
                    "Licences issued between {} and {}: {} ({} skipped)",
                    s.date_range.start,
                    s.date_range.end,
                    s.licenses_in_range.rows.len(),
                    s.licenses_in_range.skipped
                );
            })?;
        }
        Commands::Etl { input, database } => {
            let path = input.unwrap_or(config.etl.input);
            let database = database.unwrap_or(config.etl.database);
            let mut store = SqliteStore::open(&database)
                .with_context(|| format!("opening database {}", database.display()))?;
            let report = pipeline::run_etl(&path, &mut store)?;
            emit(json, &report, |r| {
                println!("ETL run {} complete", r.run_id);
                println!("  Rows extracted: {}", r.rows_extracted);
                println!("  Dates set to null: {}", r.transform.dates_nulled);
                println!("  Salaries set to null: {}", r.transform.salaries_nulled);
                println!("  Departments loaded: {}", r.load.departments_written);
                println!("  Employees loaded: {}", r.load.employees_written);
            })?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let _log_guard = logging::init_logging("logs");
    telemetry::init_metrics();

    let cli = Cli::parse();
    info!("licence_etl starting");
    if let Err(e) = run(cli) {
        error!("licence_etl failed: {:#}", e);
        return Err(e);
    }
    Ok(())
}
