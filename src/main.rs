use anyhow::{Context, Result};
use boxoffice::{
    config::Config,
    dataset::{self, date_parser::parse_user_date},
    query::DateRange,
    report::{self, ReportRequest},
};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Json,
}

/// KOBIS daily box-office report.
///
/// Loads a hive-partitioned parquet dataset once and prints the preview,
/// missing-data ratios, top-N rankings, audience time series and a
/// per-movie detail series.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Settings file (defaults to ./boxoffice.toml when present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Dataset root directory or parquet file
    #[arg(short, long, env = "BOXOFFICE_DATA", value_name = "PATH")]
    data: Option<PathBuf>,

    /// Preview columns, comma separated
    #[arg(long, value_delimiter = ',')]
    columns: Vec<String>,

    /// First day of the audience window (YYYY-MM-DD or YYYYMMDD)
    #[arg(long, value_parser = parse_date_arg)]
    start: Option<NaiveDate>,

    /// Last day of the audience window, inclusive
    #[arg(long, value_parser = parse_date_arg)]
    end: Option<NaiveDate>,

    /// Movie name for the detail series (defaults to the first movie)
    #[arg(short, long)]
    movie: Option<String>,

    /// Number of movies per ranking
    #[arg(long)]
    top: Option<usize>,

    #[arg(long, value_enum, default_value = "table")]
    format: Format,
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_user_date(s).ok_or_else(|| format!("expected YYYY-MM-DD or YYYYMMDD, got {s:?}"))
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::resolve(args.config.as_deref())?;
    let data_path = args.data.clone().unwrap_or_else(|| config.data.path.clone());
    info!(path = %data_path.display(), "startup");

    let ds = dataset::load_cached(&data_path)
        .with_context(|| format!("loading dataset from {}", data_path.display()))?;

    let range = match (args.start, args.end) {
        (None, None) => None,
        (start, end) => Some(DateRange::new(start, end)),
    };
    let req = ReportRequest {
        columns: args.columns,
        default_columns: config.data.default_columns,
        preview_rows: config.report.preview_rows,
        null_columns: config.report.null_columns,
        top_n: args.top.unwrap_or(config.report.top_n),
        range,
        movie: args.movie,
    };

    let report = report::build_report(&ds, &req).context("building report")?;
    let rendered = match args.format {
        Format::Table => report::render_text(&report)?,
        Format::Json => report::render_json(&report)?,
    };
    println!("{}", rendered);
    Ok(())
}
