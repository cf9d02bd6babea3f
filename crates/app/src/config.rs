//! Configuration for the wordsquash application.
//!
//! Handles parsing command-line arguments and resolving defaults (including
//! a time-based seed for the sample word list, printed so runs are
//! reproducible).
//!
//! # Philosophy
//!
//! The tool should work with ZERO arguments: without `--in` it generates a
//! sample word list and runs every strategy against it.

use clap::Parser;
use std::path::PathBuf;
use wordsquash_core::{Error, Result, Strategy};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "wordsquash")]
#[command(about = "Compress a sorted word list with Huffman-coded word models")]
pub struct Cli {
    /// Word list file, whitespace separated (default: generate a sample)
    #[arg(long = "in", value_name = "PATH")]
    pub input_file: Option<PathBuf>,

    /// Directory that receives one bundle per strategy
    #[arg(long, value_name = "DIR", default_value = "output")]
    pub out_dir: PathBuf,

    /// Strategies to run: `all` or a comma-separated list of letters, prefix, pairs
    #[arg(long, default_value = "all")]
    pub strategy: String,

    /// Random seed for the generated sample list
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of words in the generated sample list
    #[arg(long, default_value_t = 2000)]
    pub sample_words: usize,

    /// Print resolved configuration
    #[arg(long)]
    pub print_config: bool,

    /// Don't print the metrics summary
    #[arg(long)]
    pub no_metrics: bool,
}

/// Complete configuration for a run.
#[derive(Debug, Clone)]
pub struct Config {
    // === Files ===
    /// Input file path (None = generate sample)
    pub input_file: Option<PathBuf>,

    /// Output directory for bundles
    pub out_dir: PathBuf,

    // === Compression ===
    /// Strategies to run, in order
    pub strategies: Vec<Strategy>,

    // === Sample input ===
    /// Seed for the sample generator
    pub seed: u64,

    /// Words to generate when no input file is given
    pub sample_words: usize,

    // === Behavior ===
    /// Whether to print detailed config
    pub print_config: bool,

    /// Whether to print detailed metrics summary
    pub print_metrics: bool,
}

impl Config {
    /// Resolve parsed arguments into a run configuration.
    ///
    /// If `--seed` is absent, a time-based seed is used.
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let strategies = parse_strategies(&cli.strategy)?;

        if cli.input_file.is_none() && cli.sample_words == 0 {
            return Err(Error::Config(
                "--sample-words must be at least 1 when no --in is given".to_string(),
            ));
        }

        let seed = cli.seed.unwrap_or_else(|| {
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0)
        });

        Ok(Config {
            input_file: cli.input_file,
            out_dir: cli.out_dir,
            strategies,
            seed,
            sample_words: cli.sample_words,
            print_config: cli.print_config,
            print_metrics: !cli.no_metrics,
        })
    }

    /// Print the configuration in human-readable form.
    pub fn print(&self) {
        println!("=== Configuration ===");
        match &self.input_file {
            Some(path) => println!("Input file:  {}", path.display()),
            None => println!(
                "Input file:  (generate {} sample words, seed {})",
                self.sample_words, self.seed
            ),
        }
        println!("Output dir:  {}", self.out_dir.display());
        let names: Vec<&str> = self.strategies.iter().map(Strategy::name).collect();
        println!("Strategies:  {}", names.join(", "));
        println!();
    }
}

/// Parse `all` or a comma-separated strategy list.
fn parse_strategies(list: &str) -> Result<Vec<Strategy>> {
    if list.trim() == "all" {
        return Ok(Strategy::ALL.to_vec());
    }

    let mut strategies = Vec::new();
    for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let strategy: Strategy = name
            .parse()
            .map_err(|_| Error::Config(format!("unknown strategy: {name}")))?;
        if !strategies.contains(&strategy) {
            strategies.push(strategy);
        }
    }

    if strategies.is_empty() {
        return Err(Error::Config("no strategy selected".to_string()));
    }
    Ok(strategies)
}
