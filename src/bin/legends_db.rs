//! legends-db: Convert a legends export into relational tables
//!
//! Usage:
//!   # Write a SQLite database next to the input (region1-00250-01-01-legends.db)
//!   legends-db region1-00250-01-01-legends.xml
//!
//!   # SQL script instead, piped into sqlite3
//!   legends-db legends.xml --format sql -o - | sqlite3 legends.db
//!
//!   # One JSON Lines file per table
//!   legends-db legends.xml --format jsonl -o ./tables

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use legends_db::{
    import_pair, DeliveryReport, DocumentEncoding, ImportConfig, InputPair, JsonLinesSink,
    SqlScriptSink, SqliteSink,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// SQLite database file
    Db,
    /// SQLite script (DROP/CREATE/INSERT ... ON CONFLICT)
    Sql,
    /// One .jsonl file per table plus its schema
    Jsonl,
}

#[derive(Parser, Debug)]
#[command(name = "legends-db")]
#[command(about = "Convert a legends export into relational tables", long_about = None)]
#[command(version)]
struct Args {
    /// Base legends document; the supplemental one is found next to it
    #[arg(value_name = "LEGENDS_XML")]
    input: PathBuf,

    /// Supplemental document (default: <input stem>_plus.<ext>)
    #[arg(long)]
    plus: Option<PathBuf>,

    /// Output database (db), file (sql, "-" for stdout) or directory (jsonl)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "db")]
    format: OutputFormat,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Encoding of the base document (default: cp437)
    #[arg(long)]
    base_encoding: Option<DocumentEncoding>,

    /// Encoding of the supplemental document (default: utf-8)
    #[arg(long)]
    plus_encoding: Option<DocumentEncoding>,

    /// Also emit tables that have no columns
    #[arg(long)]
    keep_empty_tables: bool,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(&args.verbosity, &args.log_format);

    // Build config
    let mut config = match &args.config {
        Some(path) => ImportConfig::from_json_file(path)?,
        None => ImportConfig::default(),
    };
    if let Some(encoding) = args.base_encoding.clone() {
        config.base_encoding = encoding;
    }
    if let Some(encoding) = args.plus_encoding.clone() {
        config.plus_encoding = encoding;
    }
    if args.keep_empty_tables {
        config.skip_empty_tables = false;
    }

    let inputs = match &args.plus {
        Some(plus) => InputPair::new(&args.input, plus),
        None => InputPair::from_base(&args.input, &config),
    };

    let report = match args.format {
        OutputFormat::Db => {
            let output = args
                .output
                .clone()
                .unwrap_or_else(|| args.input.with_extension("db"));
            write_db(&inputs, &output, &config)?
        }
        OutputFormat::Sql => {
            let output = args
                .output
                .clone()
                .unwrap_or_else(|| args.input.with_extension("sql"));
            write_sql(&inputs, &output, &config)?
        }
        OutputFormat::Jsonl => {
            let output = args.output.clone().unwrap_or_else(|| default_table_dir(&args.input));
            let mut sink = JsonLinesSink::new(&output)?;
            let report = import_pair(&inputs, &mut sink, &config)
                .context("Import failed")?;
            info!("Tables written to {}", output.display());
            report
        }
    };

    for (table, rows) in &report.tables {
        eprintln!("{:<40} {:>8} rows", table, rows);
    }
    eprintln!("{} tables, {} rows", report.tables.len(), report.total_rows());

    Ok(())
}

fn write_db(inputs: &InputPair, output: &Path, config: &ImportConfig) -> Result<DeliveryReport> {
    // Check inputs before creating the database file
    inputs.ensure_exist()?;
    let mut sink = SqliteSink::open(output, config.id_column.as_str())?;
    let report = import_pair(inputs, &mut sink, config).context("Import failed")?;
    info!("Database written to {}", output.display());
    Ok(report)
}

fn write_sql(inputs: &InputPair, output: &Path, config: &ImportConfig) -> Result<DeliveryReport> {
    if output == Path::new("-") {
        let mut sink = SqlScriptSink::new(std::io::stdout().lock(), config.id_column.as_str());
        return import_pair(inputs, &mut sink, config).context("Import failed");
    }

    // Check inputs before touching the output file
    inputs.ensure_exist()?;
    let file = File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut sink = SqlScriptSink::new(BufWriter::new(file), config.id_column.as_str());
    let report = import_pair(inputs, &mut sink, config).context("Import failed")?;
    info!("Script written to {}", output.display());
    Ok(report)
}

fn default_table_dir(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "legends".to_string());
    input.with_file_name(format!("{}_tables", stem))
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
