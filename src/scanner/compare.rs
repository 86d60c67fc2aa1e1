//! Direct two-file content comparison.
//!
//! Deciding whether exactly two files are identical does not need a digest:
//! reading both in lockstep stops at the first difference, and often well
//! before the end of either file.
//!
//! Without transforms both files are read chunk by chunk and the chunks are
//! compared as slices. With case folding or whitespace removal each file gets
//! its own cursor, so whitespace runs of different lengths line up.

use std::fs::File;
use std::path::Path;

use super::buffer::{BufferPool, ScratchBuffer};
use super::hasher::DEFAULT_BUFFER_SIZE;
use super::transform::{is_whitespace, Transform};
use super::{read_full, FileError};

/// Compares two files without digesting them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectComparator {
    transform: Transform,
    byte_budget: u64,
    buffer_size: usize,
}

impl Default for DirectComparator {
    fn default() -> Self {
        Self::new(Transform::IDENTITY)
    }
}

impl DirectComparator {
    /// Create a comparator with the given transforms, no byte budget and
    /// the default buffer size.
    #[must_use]
    pub fn new(transform: Transform) -> Self {
        Self {
            transform,
            byte_budget: 0,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Consider at most `budget` post-transform bytes of each file (0 means all).
    #[must_use]
    pub fn with_byte_budget(mut self, budget: u64) -> Self {
        self.byte_budget = budget;
        self
    }

    /// Set the per-file buffer size; twice this much is requested from the pool.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Decide whether the files at `a` and `b` have identical content.
    ///
    /// # Errors
    ///
    /// - [`FileError::Open`] if either file cannot be opened or read
    /// - [`FileError::Allocation`] if `pool` cannot provide a buffer with
    ///   room for two halves
    pub fn equal<P: BufferPool + ?Sized>(
        &self,
        a: &Path,
        b: &Path,
        pool: &P,
    ) -> Result<bool, FileError> {
        let first = Stream::open(a)?;
        let second = Stream::open(b)?;

        let requested = self.buffer_size.saturating_mul(2);
        let allocation_error = || FileError::Allocation {
            path: a.to_path_buf(),
            requested,
        };
        let mut buffer = ScratchBuffer::acquire(pool, requested).ok_or_else(allocation_error)?;
        let half = requested.min(buffer.capacity()) / 2;
        if half == 0 {
            return Err(allocation_error());
        }
        let (left, right) = buffer[..half * 2].split_at_mut(half);

        let equal = if self.transform.is_identity() {
            bytes_same(first, left, second, right, self.byte_budget)?
        } else {
            let mut first = Cursor::new(first, left);
            let mut second = Cursor::new(second, right);
            transformed_same(&mut first, &mut second, self.transform, self.byte_budget)?
        };

        log::trace!(
            "Direct comparison {} vs {}: {}",
            a.display(),
            b.display(),
            if equal { "equal" } else { "different" }
        );
        Ok(equal)
    }
}

/// Decide whether the files at `a` and `b` have identical content.
///
/// Shorthand for [`DirectComparator::equal`].
///
/// # Errors
///
/// See [`DirectComparator::equal`].
pub fn files_equal<P: BufferPool + ?Sized>(
    a: &Path,
    b: &Path,
    transform: Transform,
    byte_budget: u64,
    buffer_size: usize,
    pool: &P,
) -> Result<bool, FileError> {
    DirectComparator::new(transform)
        .with_byte_budget(byte_budget)
        .with_buffer_size(buffer_size)
        .equal(a, b, pool)
}

/// An open file that remembers its path for error reporting.
struct Stream<'a> {
    path: &'a Path,
    file: File,
}

impl<'a> Stream<'a> {
    fn open(path: &'a Path) -> Result<Self, FileError> {
        let file = File::open(path).map_err(|e| FileError::open(path, e))?;
        Ok(Self { path, file })
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<usize, FileError> {
        read_full(&mut self.file, buf).map_err(|e| FileError::read(self.path, e))
    }
}

fn bytes_same(
    mut first: Stream<'_>,
    left: &mut [u8],
    mut second: Stream<'_>,
    right: &mut [u8],
    byte_budget: u64,
) -> Result<bool, FileError> {
    let mut remaining = byte_budget;

    loop {
        let mut n1 = first.fill(left)?;
        let mut n2 = second.fill(right)?;
        let first_ended = n1 < left.len();
        let second_ended = n2 < right.len();

        if byte_budget > 0 {
            let cap = usize::try_from(remaining).unwrap_or(usize::MAX);
            n1 = n1.min(cap);
            n2 = n2.min(cap);
        }

        if n1 != n2 || left[..n1] != right[..n2] {
            return Ok(false);
        }

        if byte_budget > 0 {
            remaining -= n1 as u64;
            if remaining == 0 {
                return Ok(true);
            }
        }

        if first_ended || second_ended {
            return Ok(first_ended && second_ended);
        }
    }
}

/// Byte-at-a-time reader over a refillable buffer.
struct Cursor<'a, 'b> {
    stream: Stream<'a>,
    buf: &'b mut [u8],
    pos: usize,
    len: usize,
}

impl<'a, 'b> Cursor<'a, 'b> {
    fn new(stream: Stream<'a>, buf: &'b mut [u8]) -> Self {
        Self {
            stream,
            buf,
            pos: 0,
            len: 0,
        }
    }

    /// Next byte without consuming it, refilling as needed. `None` at end of file.
    fn peek(&mut self) -> Result<Option<u8>, FileError> {
        if self.pos == self.len {
            self.len = self.stream.fill(self.buf)?;
            self.pos = 0;
            if self.len == 0 {
                return Ok(None);
            }
        }
        Ok(Some(self.buf[self.pos]))
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn skip_whitespace(&mut self) -> Result<(), FileError> {
        while let Some(byte) = self.peek()? {
            if !is_whitespace(byte) {
                break;
            }
            self.advance();
        }
        Ok(())
    }
}

fn transformed_same(
    first: &mut Cursor<'_, '_>,
    second: &mut Cursor<'_, '_>,
    transform: Transform,
    byte_budget: u64,
) -> Result<bool, FileError> {
    let mut compared: u64 = 0;

    loop {
        if transform.ignore_whitespace {
            first.skip_whitespace()?;
            second.skip_whitespace()?;
        }

        match (first.peek()?, second.peek()?) {
            (None, None) => return Ok(true),
            (Some(x), Some(y)) => {
                if transform.fold(x) != transform.fold(y) {
                    return Ok(false);
                }
                first.advance();
                second.advance();
                compared += 1;
                if byte_budget > 0 && compared == byte_budget {
                    return Ok(true);
                }
            }
            // One side ended while the other still has a live byte.
            _ => return Ok(false),
        }
    }
}
