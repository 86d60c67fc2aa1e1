//! Output formatters for run results.
//!
//! - Text: one line per class, streamed as classes are found
//! - JSON: one document with every class and the run summary
//!
//! # Example
//!
//! ```no_run
//! use ua::config::RunConfig;
//! use ua::duplicates::DuplicateFinder;
//! use ua::output::TextOutput;
//! use std::path::PathBuf;
//!
//! let finder = DuplicateFinder::new(RunConfig::default());
//! let output = TextOutput::new().with_separator("\t");
//! let mut stdout = std::io::stdout();
//! finder.find_with(vec![PathBuf::from("a"), PathBuf::from("b")], |class| {
//!     output.write_class(&mut stdout, class).ok();
//! });
//! ```

pub mod json;
pub mod text;

pub use json::{JsonOutput, JsonOutputError};
pub use text::TextOutput;
