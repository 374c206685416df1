//! CLI entry point for pudly.

use std::collections::BTreeMap;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use pudly::{BatchDownloader, BatchReport, Downloader, DownloaderConfig};
use serde::Serialize;
use tracing::{debug, error, info};

mod app_config;
mod cli;

use app_config::{FileConfig, load_file_config};
use cli::Args;

#[derive(Debug, Serialize)]
struct JsonReport {
    completed: Vec<PathBuf>,
    failed: Vec<JsonFailure>,
}

#[derive(Debug, Serialize)]
struct JsonFailure {
    url: String,
    error: String,
}

impl From<&BatchReport> for JsonReport {
    fn from(report: &BatchReport) -> Self {
        Self {
            completed: report.completed().map(PathBuf::from).collect(),
            failed: report
                .failures()
                .map(|(url, error)| JsonFailure {
                    url: url.to_string(),
                    error: error.to_string(),
                })
                .collect(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    let file_config = load_file_config(args.config.as_deref())?;

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config file > info
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => file_config
                .verbosity
                .map_or("info", |verbosity| verbosity.filter_directive()),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, ?file_config, "CLI arguments parsed");

    let urls = read_urls(&args.urls)?;
    if urls.is_empty() {
        info!("No input provided. Pipe URLs via stdin or pass as arguments.");
        info!("Example: echo 'https://example.com/file.pdf' | pudly");
        return Ok(());
    }

    let config = build_config(&args, &file_config)?;
    let download_dir = args.download_dir.clone().or(file_config.download_dir);
    let query_parameters: BTreeMap<String, String> = args.params.iter().cloned().collect();

    let downloader = Downloader::from_config(&config).context("Failed to set up downloader")?;
    let batch = BatchDownloader::new(downloader, config.max_concurrency)?;
    info!(
        urls = urls.len(),
        max_concurrency = config.max_concurrency,
        "pudly starting"
    );

    if args.keep_going {
        let report = batch
            .download_all_settled(urls, &query_parameters, download_dir.as_deref())
            .await;
        print_report(&report, args.json)?;
        info!(
            completed = report.completed_count(),
            failed = report.failed_count(),
            "Download complete"
        );
        if !report.is_success() {
            bail!(
                "{} of {} downloads failed",
                report.failed_count(),
                report.outcomes().len()
            );
        }
    } else {
        let paths = batch
            .download_all(urls, &query_parameters, download_dir.as_deref())
            .await
            .context("Batch download aborted")?;
        if args.json {
            let report = JsonReport {
                completed: paths,
                failed: Vec::new(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            for path in &paths {
                println!("{}", path.display());
            }
        }
        info!("Download complete");
    }

    Ok(())
}

/// URLs from arguments, else one per line from a piped stdin.
fn read_urls(args_urls: &[String]) -> Result<Vec<String>> {
    let input_text = if !args_urls.is_empty() {
        args_urls.join("\n")
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read URLs from stdin")?;
        buffer
    } else {
        String::new()
    };

    Ok(input_text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn build_config(args: &Args, file_config: &FileConfig) -> Result<DownloaderConfig> {
    let defaults = DownloaderConfig::default();
    let chunk_size = match args.chunk_size {
        Some(bytes) => usize::try_from(bytes).context("--chunk-size does not fit in memory")?,
        None => file_config.chunk_size.unwrap_or(defaults.chunk_size),
    };
    let timeout = args
        .timeout
        .or(file_config.timeout_secs)
        .map_or(defaults.timeout, Duration::from_secs);
    let max_concurrency = args
        .concurrency
        .map(usize::from)
        .or(file_config.concurrency)
        .unwrap_or(defaults.max_concurrency);

    let config = DownloaderConfig {
        chunk_size,
        timeout,
        max_concurrency,
    };
    config.validate()?;
    Ok(config)
}

fn print_report(report: &BatchReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&JsonReport::from(report))?);
        return Ok(());
    }
    for path in report.completed() {
        println!("{}", path.display());
    }
    for (url, failure) in report.failures() {
        error!(url, error = %failure, "download failed");
    }
    Ok(())
}
