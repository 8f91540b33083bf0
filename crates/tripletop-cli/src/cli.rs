//! CLI argument definitions for tripletop.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `run` | Full pipeline: download, intersect, enrich, write artifacts |
//! | `publish` | Upload an existing report artifact to Google Sheets |
//! | `lookup` | Valuation ratio for ad-hoc symbols |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--config` | `tripletop.toml` if present | TOML configuration file |
//! | `--pretty` | `false` | Pretty-print the JSON summary |
//! | `-v` | off | Debug logging (`-vv` for trace) |
//! | `--log-json` | `false` | JSON log lines on stderr |
//!
//! # Examples
//!
//! ```bash
//! # Default run: India, top 100, artifacts in ./outputs
//! tripletop run
//!
//! # Offline run from previously downloaded CSVs
//! tripletop run --input-dir ./snapshots --throttle-ms 0
//!
//! # Run and publish, sharing the sheet
//! GOOGLE_OAUTH_ACCESS_TOKEN=... tripletop run --publish --share-with me@example.com
//!
//! # Look up two symbols
//! tripletop lookup TCS INFY --pretty
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Companies in the top-N by market cap, revenue and earnings, sorted by P/E.
#[derive(Debug, Parser)]
#[command(
    name = "tripletop",
    author,
    version,
    about = "Top-N market cap / revenue / earnings intersection, sorted by P/E",
    long_about = "tripletop downloads three company rankings, keeps the companies that \
appear in the top-N of all three for one country, looks up a price-to-earnings ratio \
for each and writes a report sorted by that ratio.\n\
\n\
Use 'tripletop <command> --help' for command-specific help."
)]
pub struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Emit log lines as JSON.
    #[arg(long, global = true, default_value_t = false)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full pipeline and write artifacts.
    ///
    /// # Examples
    ///
    ///   tripletop run
    ///   tripletop run --country "United States" --top 50
    ///   tripletop run --input-dir ./snapshots --publish
    Run(RunArgs),

    /// Publish an existing report CSV to a new Google spreadsheet.
    ///
    /// # Examples
    ///
    ///   tripletop publish outputs/common_with_pe_sorted.csv
    Publish(PublishArgs),

    /// Look up valuation ratios for symbols.
    ///
    /// Unqualified alphabetic symbols fall back to the market suffix.
    ///
    /// # Examples
    ///
    ///   tripletop lookup TCS RELIANCE.NS
    Lookup(LookupArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Country filter; an empty value disables filtering.
    #[arg(long)]
    pub country: Option<String>,

    /// Companies kept per ranking.
    #[arg(long = "top")]
    pub top_n: Option<usize>,

    /// Directory for CSV artifacts.
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Read `<dataset>.csv` files from this directory instead of downloading.
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    /// Concurrent valuation lookups (1-8).
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Minimum delay between valuation lookups in milliseconds.
    #[arg(long)]
    pub throttle_ms: Option<u64>,

    /// Publish the report to Google Sheets after writing artifacts.
    #[arg(long, default_value_t = false)]
    pub publish: bool,

    /// Email address granted writer access to the published sheet.
    #[arg(long)]
    pub share_with: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct PublishArgs {
    /// Report artifact to upload.
    pub report: PathBuf,

    /// Email address granted writer access to the sheet.
    #[arg(long)]
    pub share_with: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct LookupArgs {
    /// One or more ticker symbols.
    #[arg(required = true)]
    pub symbols: Vec<String>,

    /// Concurrent valuation lookups (1-8).
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Minimum delay between valuation lookups in milliseconds.
    #[arg(long)]
    pub throttle_ms: Option<u64>,
}
