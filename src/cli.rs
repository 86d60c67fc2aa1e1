//! Command-line interface definitions.
//!
//! # Example
//!
//! ```bash
//! # Identical files among a list of paths
//! ua a.txt b.txt c.txt
//!
//! # Paths piped from a directory walk, case and whitespace insensitive
//! find . -type f | ua -i -w -
//!
//! # Only the first 4 KiB count, confirmed against full content
//! find . -type f | ua -m 4KiB -2 -
//!
//! # Digest first, quoted paths, tab separated
//! ua -p -q -s $'\t' -a sha256 *.bin
//! ```

use std::path::PathBuf;

use bytesize::ByteSize;
use clap::{Parser, ValueEnum};

use crate::config::ConfigOverrides;

/// Find files with identical content.
///
/// Prints one line per set of identical files. Paths are taken from the
/// command line; `-` reads newline-separated paths from stdin.
#[derive(Debug, Parser)]
#[command(name = "ua")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Files to compare (`-` reads paths from stdin, one per line)
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Ignore letter case (ASCII only)
    #[arg(short = 'i', long)]
    pub ignore_case: bool,

    /// Ignore whitespace (space, tab, CR, LF)
    #[arg(short = 'w', long)]
    pub ignore_whitespace: bool,

    /// Do not bucket files by size first
    #[arg(short = 'n', long)]
    pub no_size_groups: bool,

    /// Only compare the first SIZE bytes of each file (after transforms)
    ///
    /// Supports suffixes such as KB, KiB, MB, MiB.
    #[arg(short = 'm', long = "max-bytes", value_name = "SIZE", value_parser = parse_size)]
    pub max_bytes: Option<u64>,

    /// Confirm matches within --max-bytes against full content
    #[arg(short = '2', long)]
    pub two_stage: bool,

    /// Separator between fields of an output line
    #[arg(short = 's', long, value_name = "SEP", default_value = " ")]
    pub separator: String,

    /// Print each class's digest before its paths
    #[arg(short = 'p', long)]
    pub print_digest: bool,

    /// Work buffer size in bytes
    #[arg(short = 'b', long, value_name = "SIZE", value_parser = parse_size)]
    pub buffer_size: Option<u64>,

    /// Hash algorithm: md5, sha1, sha256, b3 (blake3), xxh64 (xxhash64)
    #[arg(short = 'a', long, value_name = "ALG")]
    pub algorithm: Option<String>,

    /// Wrap printed paths in single quotes
    #[arg(short = 'q', long)]
    pub quote: bool,

    /// Number of worker threads
    #[arg(short = 't', long, value_name = "NUM")]
    pub threads: Option<usize>,

    /// Disable progressive prefix elimination
    #[arg(short = 'M', long)]
    pub no_milestones: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Configuration file (TOML)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Report errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,

    /// Show a progress bar on stderr
    #[arg(long, conflicts_with = "quiet")]
    pub progress: bool,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all log output except errors (long form only)
    #[arg(long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per class
    Text,
    /// A single JSON document
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl Cli {
    /// Configuration values given on the command line.
    ///
    /// Switches only override lower layers when they are set.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        let set = |flag: bool| flag.then_some(true);
        let unset = |flag: bool| flag.then_some(false);
        ConfigOverrides {
            algorithm: self.algorithm.clone(),
            ignore_case: set(self.ignore_case),
            ignore_whitespace: set(self.ignore_whitespace),
            byte_budget: self.max_bytes,
            buffer_size: self
                .buffer_size
                .map(|size| usize::try_from(size).unwrap_or(usize::MAX)),
            two_stage: set(self.two_stage),
            milestone: unset(self.no_milestones),
            threads: self.threads,
            group_by_size: unset(self.no_size_groups),
            report_digests: set(self.print_digest || self.format == OutputFormat::Json),
        }
    }
}

/// Parse a human-readable size such as `4096`, `4KiB` or `1.5 MB` into bytes.
///
/// # Examples
///
/// ```
/// use ua::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1KiB").unwrap(), 1024);
/// assert_eq!(parse_size("1MB").unwrap(), 1_000_000);
/// ```
///
/// # Errors
///
/// Returns a message if the string is not a size.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }
    if let Ok(bytes) = s.parse::<u64>() {
        return Ok(bytes);
    }
    s.parse::<ByteSize>()
        .map(|size| size.as_u64())
        .map_err(|e| format!("Invalid size '{s}': {e}"))
}
