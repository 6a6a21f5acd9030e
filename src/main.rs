//! CLI entry point for the turnstile density tool.
//!
//! Provides subcommands for downloading weekly turnstile files, cleaning them
//! into net counts, aggregating the cleaned table, and deriving per-station
//! metrics.

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use turnstile_density::{
    config::Config,
    fetch::{
        BasicClient, download_weeks,
        weeks::{most_recent_saturday, saturdays_after},
    },
    output::{append_record, print_json, print_pretty, write_table},
    parser::{parse_date, read_table},
    wrangle::{
        aggregate::{Grouping, SpatialGrain, aggregate_by},
        complex::{ComplexLookup, merge_complex},
        metrics::{add_metrics, cumulative_share, daily_totals, station_ranking, station_shares},
        pipeline::{run, weeks_for},
        reconcile::{Threshold, reconcile},
        types::CleanedReading,
    },
};

#[derive(Parser)]
#[command(name = "turnstile_density")]
#[command(about = "Turn cumulative turnstile counters into per-station traffic metrics", long_about = None)]
struct Cli {
    /// Optional JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding weekly turnstile files
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download every missing weekly file since a date
    Fetch {
        /// Earliest date wanted (YYYY-MM-DD)
        #[arg(value_name = "EARLIEST")]
        earliest: Option<String>,

        /// Per-request timeout in seconds
        #[arg(long, default_value_t = 120)]
        timeout: u64,
    },
    /// Clean one week, or all weeks between two dates, into net counts
    Clean {
        /// Saturday of the (first) week, YYYY-MM-DD or YYMMDD
        start: Option<String>,

        /// Saturday of the last week, if more than one is wanted
        end: Option<String>,

        /// CSV file to write the cleaned table to
        #[arg(short, long, default_value = "cleaned.csv")]
        output: PathBuf,

        /// Largest plausible net count per interval
        #[arg(short, long)]
        threshold: Option<u64>,

        /// Gzip compress the output
        #[arg(long, default_value_t = false)]
        gzip: bool,

        /// CSV file to append the run summary to
        #[arg(long)]
        stats_log: Option<PathBuf>,

        /// Remote/booth to complex lookup; keeps only rows it matches
        #[arg(long)]
        complex_lookup: Option<PathBuf>,
    },
    /// Sum net counts over temporal and spatial grains
    Aggregate {
        /// Cleaned table (or raw weekly file) to read
        #[arg(short, long)]
        input: PathBuf,

        /// Grains: datetime, date, time, weekday, daytype, turnstile, booth, station, complex
        #[arg(short, long = "by", required = true, num_args = 1..)]
        by: Vec<String>,

        /// CSV file to write aggregate rows to
        #[arg(short, long, default_value = "aggregate.csv")]
        output: PathBuf,

        /// Threshold used if the input still needs reconciling
        #[arg(short, long)]
        threshold: Option<u64>,

        /// Remote/booth to complex lookup; keeps only rows it matches
        #[arg(long)]
        complex_lookup: Option<PathBuf>,
    },
    /// Attach derived metrics to a cleaned table
    Metrics {
        /// Cleaned table (or raw weekly file) to read
        #[arg(short, long)]
        input: PathBuf,

        /// CSV file to write the table with metric columns to
        #[arg(short, long, default_value = "metrics.csv")]
        output: PathBuf,

        /// Optional: per-station daily share table
        #[arg(long)]
        shares: Option<PathBuf>,

        /// Optional: total daily entries table
        #[arg(long)]
        daily: Option<PathBuf>,

        /// Optional: station ranking by mean daily share
        #[arg(long)]
        ranking: Option<PathBuf>,

        /// Optional: cumulative share of entries by top-N stations
        #[arg(long)]
        cumulative: Option<PathBuf>,

        /// Threshold used if the input still needs reconciling
        #[arg(short, long)]
        threshold: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/turnstile_density.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("turnstile_density.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    }
    .with_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    match cli.command {
        Commands::Fetch { earliest, timeout } => {
            let earliest = earliest.unwrap_or_else(|| config.earliest.clone());
            if earliest.len() != 10 {
                anyhow::bail!("EARLIEST must be in YYYY-MM-DD format, got '{earliest}'");
            }
            let cutoff = parse_date(&earliest)?;
            let last_sat = most_recent_saturday(Local::now().date_naive());
            let saturdays = saturdays_after(cutoff, last_sat);
            info!(from = %cutoff, to = %last_sat, weeks = saturdays.len(), "Fetching weekly files");

            let client = BasicClient::new(Duration::from_secs(timeout))?;
            download_weeks(&client, &config.base_url, &config.data_dir, &saturdays).await?;
        }
        Commands::Clean {
            start,
            end,
            output,
            threshold,
            gzip,
            stats_log,
            complex_lookup,
        } => {
            let start = parse_date(start.as_deref().unwrap_or(&config.default_week))?;
            let end = end.as_deref().map(parse_date).transpose()?;
            let threshold = Threshold(threshold.unwrap_or(config.threshold));

            let weeks = weeks_for(start, end);
            let mut cleaned = run(&config.data_dir, &weeks, threshold)?;
            if let Some(path) = complex_lookup {
                cleaned.rows = with_complexes(cleaned.rows, &path)?;
            }
            if cleaned.rows.is_empty() {
                warn!(data_dir = %config.data_dir.display(), "No readings survived cleaning");
            }

            write_table(&output, &cleaned.rows, gzip)?;
            print_pretty(&cleaned.stats);
            print_json(&cleaned.stats)?;
            if let Some(log) = stats_log {
                append_record(&log, &cleaned.stats)?;
            }
        }
        Commands::Aggregate {
            input,
            by,
            output,
            threshold,
            complex_lookup,
        } => {
            let grouping = Grouping::parse(by.as_slice())?;
            let mut rows = load_cleaned(&input, threshold.unwrap_or(config.threshold))?;
            if let Some(path) = complex_lookup {
                rows = with_complexes(rows, &path)?;
            } else if grouping.spatial == SpatialGrain::Complex
                && rows.iter().all(|r| r.complex_id.is_none())
            {
                warn!("No rows carry a complex id; pass --complex-lookup");
            }

            let aggregated = aggregate_by(&rows, grouping);
            info!(
                temporal = ?grouping.temporal,
                spatial = ?grouping.spatial,
                groups = aggregated.len(),
                "Aggregated"
            );
            write_table(&output, &aggregated, false)?;
        }
        Commands::Metrics {
            input,
            output,
            shares,
            daily,
            ranking,
            cumulative,
            threshold,
        } => {
            let rows = load_cleaned(&input, threshold.unwrap_or(config.threshold))?;

            write_table(&output, &add_metrics(&rows), false)?;
            if let Some(path) = shares {
                write_table(&path, &station_shares(&rows), false)?;
            }
            if let Some(path) = daily {
                write_table(&path, &daily_totals(&rows), false)?;
            }
            if ranking.is_some() || cumulative.is_some() {
                let ranked = station_ranking(&rows);
                if let Some(path) = ranking {
                    write_table(&path, &ranked, false)?;
                }
                if let Some(path) = cumulative {
                    write_table(&path, &cumulative_share(&ranked), false)?;
                }
            }
        }
    }

    Ok(())
}

/// Reads a table and reconciles it unless it already carries net counts.
#[tracing::instrument(skip(input), fields(input = %input.display()))]
fn load_cleaned(input: &Path, threshold: u64) -> Result<Vec<CleanedReading>> {
    let table = read_table(input).with_context(|| format!("loading {}", input.display()))?;
    let before = table.len();
    let already_reconciled = table.is_reconciled();

    let rows = reconcile(table, Threshold(threshold));
    info!(
        rows_in = before,
        rows_out = rows.len(),
        already_reconciled,
        "Table loaded"
    );
    Ok(rows)
}

/// Joins complex ids onto `rows`, dropping rows the lookup does not cover.
fn with_complexes(rows: Vec<CleanedReading>, lookup: &Path) -> Result<Vec<CleanedReading>> {
    let lookup = ComplexLookup::load(lookup)?;
    let before = rows.len();
    let rows = merge_complex(rows, &lookup);
    info!(
        rows_in = before,
        rows_out = rows.len(),
        pairs = lookup.len(),
        "Complex ids attached"
    );
    Ok(rows)
}
