use anyhow::{Context, Result};
use clap::Parser;
use ladder::{run_batch, FfmpegTranscoder, LadderConfig};
use log::info;
use std::fs::OpenOptions;
use std::path::PathBuf;

/// Encode every video in a directory into the 1080p/720p/360p/180p ladder
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory to scan (defaults to the configured batch root, or the executable's directory)
    root: Option<PathBuf>,

    /// Path to configuration file (JSON or TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write a JSON report of every job to this file
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut cfg = LadderConfig::load_config(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(root) = args.root {
        cfg.batch_root = root;
    }

    let created = cfg.ensure_output_dir().context("Failed to prepare output directory")?;
    init_logger(&cfg, args.verbose);

    if created {
        info!("make directory: {}", cfg.output_dir().display());
    }
    info!("Encode ladder starting");
    info!("  Batch root: {}", cfg.batch_root.display());
    info!("  Output dir: {}", cfg.output_dir().display());
    info!("  ffmpeg: {}", cfg.ffmpeg_bin.display());

    let transcoder = FfmpegTranscoder::new(cfg.ffmpeg_bin.clone());
    let report = run_batch(&cfg, &transcoder)
        .await
        .context("Batch run failed")?;

    if let Some(path) = args.report {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
    }

    println!(
        "{} file(s) processed, {} skipped, {} job(s) succeeded, {} failed (log: {})",
        report.files_seen,
        report.files_skipped,
        report.completed(),
        report.failed(),
        cfg.log_path().display()
    );

    Ok(())
}

/// Log into the append-only log file, or stderr if it cannot be opened
fn init_logger(cfg: &LadderConfig, verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));
    builder.format_timestamp_secs();

    let log_path = cfg.log_path();
    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(e) => {
            eprintln!("Could not open log file {}: {}, logging to stderr", log_path.display(), e);
        }
    }

    builder.init();
}
