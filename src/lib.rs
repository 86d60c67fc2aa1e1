//! ua - find files with identical content
//!
//! Given a list of paths, `ua` reports every set of files whose contents are
//! identical, optionally ignoring letter case and whitespace and optionally
//! looking only at a bounded prefix of each file. Work is kept to a minimum by
//! bucketing files by size, settling pairs by direct comparison and discarding
//! candidates with unique prefixes before any full digest is computed.

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;

use std::io::{self, BufRead, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use crate::cli::{Cli, OutputFormat};
use crate::config::RunConfig;
use crate::duplicates::DuplicateFinder;
use crate::error::ExitCode;
use crate::output::{JsonOutput, TextOutput};
use crate::progress::Progress;

/// Run the command line application.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the path list cannot be
/// read, or results cannot be written.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet).context("Failed to initialize logging")?;

    let config = RunConfig::load(cli.config.as_deref(), &cli.overrides())
        .context("Invalid configuration")?;

    let paths = collect_paths(&cli.files, || io::stdin().lock())
        .context("Failed to read paths from stdin")?;
    if paths.is_empty() {
        log::warn!("No paths given");
    }

    let mut finder = DuplicateFinder::new(config);
    if cli.progress {
        finder = finder.with_progress_callback(Arc::new(Progress::new(false)));
    }

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let summary = match cli.format {
        OutputFormat::Text => {
            let text = TextOutput::new()
                .with_separator(cli.separator.as_str())
                .with_digest(cli.print_digest)
                .with_quotes(cli.quote);
            let mut write_error = None;
            let summary = finder.find_with(paths, |class| {
                if write_error.is_none() {
                    if let Err(e) = text.write_class(&mut out, class) {
                        write_error = Some(e);
                    }
                }
            });
            if let Some(e) = write_error {
                return Err(e).context("Failed to write results");
            }
            summary
        }
        OutputFormat::Json => {
            let (classes, summary) = finder.find(paths);
            JsonOutput::new(&classes, &summary, ExitCode::for_summary(&summary))
                .write_to(&mut out, true)
                .context("Failed to write results")?;
            summary
        }
    };
    out.flush().context("Failed to write results")?;

    if summary.is_partial() {
        log::warn!(
            "{} of {} files could not be read and were skipped",
            summary.skipped_files(),
            summary.input_files
        );
    }
    Ok(ExitCode::for_summary(&summary))
}

/// Expand the positional arguments into the list of paths to compare.
///
/// `-` is replaced by the paths read from `stdin`, one per line; with no
/// arguments at all, stdin is read as well. Empty lines are ignored.
///
/// # Errors
///
/// Returns an error if stdin cannot be read.
pub fn collect_paths<R, F>(args: &[PathBuf], stdin: F) -> io::Result<Vec<PathBuf>>
where
    R: BufRead,
    F: FnOnce() -> R,
{
    let wants_stdin = args.is_empty() || args.iter().any(|a| a.as_os_str() == "-");
    let mut from_stdin = if wants_stdin {
        Some(read_path_list(stdin())?)
    } else {
        None
    };

    if args.is_empty() {
        return Ok(from_stdin.unwrap_or_default());
    }

    let mut paths = Vec::with_capacity(args.len());
    for arg in args {
        if arg.as_os_str() == "-" {
            // Only the first `-` contributes; stdin is consumed once.
            paths.extend(from_stdin.take().unwrap_or_default());
        } else {
            paths.push(arg.clone());
        }
    }
    Ok(paths)
}

/// Read newline-separated paths, skipping empty lines.
///
/// Lines are taken as raw bytes, so names that are not valid UTF-8 survive
/// unchanged on unix. A trailing `\r` is dropped.
///
/// # Errors
///
/// Returns an error if reading fails.
pub fn read_path_list<R: BufRead>(reader: R) -> io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for line in reader.split(b'\n') {
        let mut bytes = line?;
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
        if !bytes.is_empty() {
            paths.push(path_from_bytes(bytes));
        }
    }
    Ok(paths)
}

#[cfg(unix)]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    use std::os::unix::ffi::OsStringExt;
    PathBuf::from(std::ffi::OsString::from_vec(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(&bytes).into_owned())
}
