//! Logging setup using the `log` facade and the `env_logger` backend.
//!
//! The level comes from, in priority order:
//!
//! 1. the `RUST_LOG` environment variable, if set
//! 2. `--quiet` (errors only) or `-v`/`-vv` (debug/trace)
//! 3. the default, info
//!
//! Log records always go to stderr; stdout is reserved for results.
//!
//! # Example
//!
//! ```rust,no_run
//! use ua::logging::init_logging;
//!
//! // -v: per-file skips become visible
//! init_logging(1, false).ok();
//! log::debug!("Skipping /tmp/x: permission denied");
//! ```

use std::env;
use std::io::Write;

use env_logger::{Builder, Target};
use log::{LevelFilter, SetLoggerError};

/// Initialize the logger from CLI verbosity flags.
///
/// Call once, before any logging.
///
/// # Errors
///
/// Returns [`SetLoggerError`] if a logger has already been installed.
pub fn init_logging(verbose: u8, quiet: bool) -> Result<(), SetLoggerError> {
    let from_env = env::var_os("RUST_LOG").is_some();

    let mut builder = Builder::new();
    builder.target(Target::Stderr);
    if from_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(level_for(verbose, quiet));
    }
    configure_format(&mut builder, verbose);
    builder.try_init()?;

    if from_env {
        log::debug!("Logging configured from RUST_LOG");
    } else {
        log::debug!("Logging initialized at level {}", current_level_name());
    }
    Ok(())
}

/// Level selected by the CLI flags alone.
///
/// `quiet` wins over any number of `-v`.
#[must_use]
pub fn level_for(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Debug builds add a timestamp, and the module path once `-v` is given.
/// Release builds print level and message only.
fn configure_format(builder: &mut Builder, verbose: u8) {
    #[cfg(debug_assertions)]
    {
        builder.format(move |buf, record| {
            let timestamp = buf.timestamp_seconds();
            let level = record.level();
            let style = buf.default_level_style(level);
            if verbose >= 1 {
                writeln!(
                    buf,
                    "{timestamp} {style}{level:<5}{style:#} [{}] {}",
                    record.module_path().unwrap_or("unknown"),
                    record.args()
                )
            } else {
                writeln!(buf, "{timestamp} {style}{level:<5}{style:#} {}", record.args())
            }
        });
    }

    #[cfg(not(debug_assertions))]
    {
        let _ = verbose;
        builder.format(|buf, record| {
            let level = record.level();
            let style = buf.default_level_style(level);
            writeln!(buf, "{style}{level:<5}{style:#} {}", record.args())
        });
    }
}

/// Name of the current maximum log level.
#[must_use]
pub fn current_level_name() -> &'static str {
    match log::max_level() {
        LevelFilter::Off => "off",
        LevelFilter::Error => "error",
        LevelFilter::Warn => "warn",
        LevelFilter::Info => "info",
        LevelFilter::Debug => "debug",
        LevelFilter::Trace => "trace",
    }
}
