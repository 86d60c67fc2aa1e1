//! Content transforms applied before digesting or comparing.
//!
//! Both transforms work in place on a chunk of file bytes. Case folding only
//! touches ASCII letters. Whitespace means space, tab, carriage return and
//! line feed; every run of it is removed entirely.

use serde::{Deserialize, Serialize};

/// Whether `byte` counts as whitespace for [`Transform::ignore_whitespace`].
#[inline]
#[must_use]
pub fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n')
}

/// Remove all whitespace from `chunk`, compacting the survivors to the front.
///
/// Returns `(new_len, removed)`. Bytes past `new_len` are unspecified.
pub fn strip_whitespace(chunk: &mut [u8]) -> (usize, usize) {
    let mut write = 0;
    for read in 0..chunk.len() {
        let byte = chunk[read];
        if !is_whitespace(byte) {
            chunk[write] = byte;
            write += 1;
        }
    }
    (write, chunk.len() - write)
}

/// Case and whitespace insensitivity settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transform {
    /// Fold ASCII letters to lower case.
    pub ignore_case: bool,
    /// Drop space, tab, CR and LF.
    pub ignore_whitespace: bool,
}

impl Transform {
    /// Transform that leaves content untouched.
    pub const IDENTITY: Self = Self {
        ignore_case: false,
        ignore_whitespace: false,
    };

    /// Create a transform from the two flags.
    #[must_use]
    pub fn new(ignore_case: bool, ignore_whitespace: bool) -> Self {
        Self {
            ignore_case,
            ignore_whitespace,
        }
    }

    /// Whether this transform changes nothing.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        !self.ignore_case && !self.ignore_whitespace
    }

    /// Apply the transform to `chunk` in place and return the surviving length.
    pub fn apply(&self, chunk: &mut [u8]) -> usize {
        if self.ignore_case {
            chunk.make_ascii_lowercase();
        }
        if self.ignore_whitespace {
            strip_whitespace(chunk).0
        } else {
            chunk.len()
        }
    }

    /// Fold a single byte the way [`apply`](Self::apply) folds a chunk.
    #[inline]
    #[must_use]
    pub fn fold(&self, byte: u8) -> u8 {
        if self.ignore_case {
            byte.to_ascii_lowercase()
        } else {
            byte
        }
    }
}
