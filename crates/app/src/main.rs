//! wordsquash: compress a sorted word list with every word model and verify
//! that each bundle expands back to the exact input.

mod config;
mod input_gen;

use clap::Parser;
use config::{Cli, Config};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use wordsquash_core::codec::{self, join_words};
use wordsquash_core::metrics::{Report, StrategyReport};
use wordsquash_core::Result;

/// File name used for a generated sample list inside the output directory.
const SAMPLE_FILE_NAME: &str = "words.list";

fn main() -> ExitCode {
    init_tracing();

    let config = match Config::from_cli(Cli::parse()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    if config.print_config {
        config.print();
    }

    match run(&config) {
        Ok(report) => {
            if config.print_metrics {
                report.print_summary();
            }
            report.print_result();
            if report.all_verified() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!(error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Compress the input with every configured strategy and verify each bundle.
fn run(config: &Config) -> Result<Report> {
    let text = match &config.input_file {
        Some(path) => {
            // Read before clearing: the input may live in the output directory.
            let text = fs::read_to_string(path)?;
            prepare_output_dir(&config.out_dir, Some(path.as_path()))?;
            text
        }
        None => {
            prepare_output_dir(&config.out_dir, None)?;
            let path = config.out_dir.join(SAMPLE_FILE_NAME);
            input_gen::write_sample_file(&path, config.seed, config.sample_words)?;
            info!(path = %path.display(), seed = config.seed, "generated sample word list");
            fs::read_to_string(&path)?
        }
    };

    let words: Vec<&str> = text.split_whitespace().collect();
    let plain = join_words(&words);
    info!(words = words.len(), bytes = text.len(), "read word list");

    let mut report = Report::new(words.len(), plain.len());

    for &strategy in &config.strategies {
        let started = Instant::now();

        let bundle = codec::compress(strategy, &words)?;
        let bundle_text = bundle.to_text();
        let path = bundle_path(&config.out_dir, strategy.name());
        fs::write(&path, &bundle_text)?;

        // Verify from what actually landed on disk, not the in-memory bundle.
        let written = fs::read_to_string(&path)?;
        let verified = match codec::expand_text(&written) {
            Ok(expanded) => expanded == plain,
            Err(e) => {
                warn!(%strategy, error = %e, "bundle failed to expand");
                false
            }
        };
        if !verified {
            warn!(%strategy, path = %path.display(), "round trip mismatch");
        }

        println!("{:9} {}", bundle_text.len(), path.display());
        report.record(StrategyReport {
            strategy,
            bundle_bytes: bundle_text.len(),
            payload_bits: bundle.payload_bits.unwrap_or_default(),
            elapsed: started.elapsed(),
            verified,
        });
    }

    report.complete();
    Ok(report)
}

fn bundle_path(out_dir: &Path, name: &str) -> PathBuf {
    out_dir.join(format!("{name}.txt"))
}

/// Create the output directory and delete bundles left by earlier runs,
/// sparing `keep`.
fn prepare_output_dir(dir: &Path, keep: Option<&Path>) -> Result<()> {
    fs::create_dir_all(dir)?;
    let keep = keep.map(fs::canonicalize).transpose()?;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.extension().is_some_and(|ext| ext == "txt") {
            continue;
        }
        if keep.is_some() && fs::canonicalize(&path).ok() == keep {
            debug!(path = %path.display(), "keeping input file");
            continue;
        }
        debug!(path = %path.display(), "removing stale bundle");
        fs::remove_file(&path)?;
    }
    Ok(())
}
