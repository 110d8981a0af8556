//! Command-line runner: ViewDefinition + Bundle in, tabular bytes out.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde_json::Value;
use sof::{ContentType, FhirVersion, RunOptions, run_view_definition_with_options};

#[derive(Parser, Debug)]
#[command(
    name = "sof",
    version,
    about = "Run a SQL-on-FHIR ViewDefinition against a FHIR Bundle"
)]
struct Cli {
    /// Path to the ViewDefinition JSON file ("-" for stdin).
    #[arg(short, long)]
    view: String,

    /// Path to the Bundle JSON file ("-" for stdin).
    #[arg(short, long)]
    bundle: String,

    /// Output format: csv, json, ndjson, parquet, or a MIME type such as
    /// "text/csv;header=false".
    #[arg(short, long, default_value = "csv")]
    format: String,

    /// Omit the CSV header row.
    #[arg(long)]
    no_headers: bool,

    /// Write output to a file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only include resources updated at or after this RFC 3339 instant.
    #[arg(long)]
    since: Option<String>,

    /// Maximum number of rows to emit.
    #[arg(long)]
    limit: Option<usize>,

    /// 1-based page of rows to emit; requires --limit.
    #[arg(long)]
    page: Option<usize>,

    /// Number of worker threads (default: number of CPUs).
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// FHIR version of the input documents.
    #[arg(long, default_value = "R4")]
    fhir_version: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.view == "-" && cli.bundle == "-" {
        bail!("only one of --view and --bundle can read from stdin");
    }

    let view = read_json(&cli.view).context("reading ViewDefinition")?;
    let bundle = read_json(&cli.bundle).context("reading Bundle")?;

    let mut content_type = ContentType::from_string(&cli.format)?;
    if cli.no_headers {
        if content_type != ContentType::CsvWithHeader {
            bail!("--no-headers only applies to CSV output");
        }
        content_type = ContentType::Csv;
    }

    let since = cli
        .since
        .as_deref()
        .map(|s| {
            chrono::DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .with_context(|| format!("invalid --since timestamp: {s}"))
        })
        .transpose()?;

    let options = RunOptions {
        since,
        limit: cli.limit,
        page: cli.page,
        fhir_version: FhirVersion::from_string(&cli.fhir_version)?,
        num_threads: cli.threads,
    };

    let bytes = run_view_definition_with_options(&view, &bundle, content_type, options)?;

    match &cli.output {
        Some(path) => {
            fs::write(path, &bytes)
                .with_context(|| format!("writing output to {}", path.display()))?;
            tracing::info!(path = %path.display(), bytes = bytes.len(), "output written");
        }
        None => {
            io::stdout().write_all(&bytes)?;
        }
    }

    Ok(())
}

fn read_json(source: &str) -> Result<Value> {
    let text = if source == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(source).with_context(|| format!("cannot read {source}"))?
    };
    serde_json::from_str(&text).context("input is not valid JSON")
}
