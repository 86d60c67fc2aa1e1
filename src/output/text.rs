//! Line-oriented text output.
//!
//! Each class is written as one line: optionally the digest in hex, then the
//! head, then every member, all joined by the separator. With quoting on,
//! paths are wrapped in single quotes the way a POSIX shell expects them.

use std::io::Write;
use std::path::Path;

use crate::duplicates::EquivalenceClass;

/// Writes classes as separator-joined lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOutput {
    separator: String,
    print_digest: bool,
    quote: bool,
}

impl Default for TextOutput {
    fn default() -> Self {
        Self {
            separator: " ".to_string(),
            print_digest: false,
            quote: false,
        }
    }
}

impl TextOutput {
    /// Create a formatter with a one-space separator, no digest, no quotes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the field separator.
    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Print the class digest as the first field.
    ///
    /// Classes without a digest get `-` in that field.
    #[must_use]
    pub fn with_digest(mut self, enabled: bool) -> Self {
        self.print_digest = enabled;
        self
    }

    /// Wrap every path in single quotes.
    #[must_use]
    pub fn with_quotes(mut self, enabled: bool) -> Self {
        self.quote = enabled;
        self
    }

    /// Render one class as a line, without the trailing newline.
    #[must_use]
    pub fn format_class(&self, class: &EquivalenceClass) -> String {
        let mut fields = Vec::with_capacity(class.len() + 1);
        if self.print_digest {
            fields.push(class.digest.map_or_else(|| "-".to_string(), |d| d.to_hex()));
        }
        fields.extend(class.paths().map(|path| self.format_path(path)));
        fields.join(&self.separator)
    }

    /// Write one class as a line.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_class<W: Write>(&self, writer: &mut W, class: &EquivalenceClass) -> std::io::Result<()> {
        writeln!(writer, "{}", self.format_class(class))
    }

    fn format_path(&self, path: &Path) -> String {
        let s = path.to_string_lossy();
        if self.quote {
            format!("'{}'", s.replace('\'', "'\\''"))
        } else {
            s.into_owned()
        }
    }
}
