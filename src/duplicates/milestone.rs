//! Progressive prefix elimination.
//!
//! Before a candidate group is fully digested, it is run through a ladder of
//! growing prefix lengths. At each step every candidate's prefix is digested
//! with xxHash64, and candidates whose prefix digest is shared by no other
//! candidate are dropped: a file that differs from all others in its first N
//! bytes cannot be identical to any of them.
//!
//! The ladder depends on the file size, so large files are checked at coarse
//! steps rather than re-reading small prefixes many times:
//!
//! | File size   | Steps                                              |
//! |-------------|----------------------------------------------------|
//! | > 1 GiB     | 1, 4, 16, 64, 256 MiB                              |
//! | > 100 MiB   | 256 KiB, 1, 4, 16, 64 MiB                          |
//! | > 10 MiB    | 64 KiB, 256 KiB, 1, 4, 16 MiB                      |
//! | otherwise   | 1, 4, 16, 64, 256 KiB, 1, 4, 16, 64 MiB            |

use std::collections::HashMap;
use std::path::PathBuf;

use bytesize::ByteSize;
use rayon::prelude::*;

use crate::scanner::hasher::DEFAULT_BUFFER_SIZE;
use crate::scanner::{BufferPool, Digest, FileError, HashAlgorithm, Hasher, Transform};

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// Ascending list of prefix lengths to check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ladder {
    steps: Vec<u64>,
}

impl Ladder {
    /// The standard ladder for files of `size` bytes.
    #[must_use]
    pub fn for_size(size: u64) -> Self {
        let steps = if size > GIB {
            vec![MIB, 4 * MIB, 16 * MIB, 64 * MIB, 256 * MIB]
        } else if size > 100 * MIB {
            vec![256 * KIB, MIB, 4 * MIB, 16 * MIB, 64 * MIB]
        } else if size > 10 * MIB {
            vec![64 * KIB, 256 * KIB, MIB, 4 * MIB, 16 * MIB]
        } else {
            vec![
                KIB,
                4 * KIB,
                16 * KIB,
                64 * KIB,
                256 * KIB,
                MIB,
                4 * MIB,
                16 * MIB,
                64 * MIB,
            ]
        };
        Self { steps }
    }

    /// A ladder with the given steps.
    ///
    /// Steps are sorted ascending; zeros and repeats are dropped.
    #[must_use]
    pub fn custom(steps: impl Into<Vec<u64>>) -> Self {
        let mut steps = steps.into();
        steps.retain(|&step| step > 0);
        steps.sort_unstable();
        steps.dedup();
        Self { steps }
    }

    /// The prefix lengths, ascending.
    #[must_use]
    pub fn steps(&self) -> &[u64] {
        &self.steps
    }
}

/// Result of running candidates through a ladder.
#[derive(Debug, Clone, Default)]
pub struct Elimination {
    /// Candidates that still share every prefix digest with another, in input order
    pub survivors: Vec<PathBuf>,
    /// Ladder steps actually run
    pub rounds: usize,
    /// Candidates dropped because a prefix digest was unique
    pub eliminated: usize,
    /// Candidates dropped because they could not be read
    pub failed: Vec<FileError>,
}

/// Runs candidate groups through a prefix [`Ladder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MilestoneEliminator {
    transform: Transform,
    buffer_size: usize,
    max_prefix: Option<u64>,
}

impl Default for MilestoneEliminator {
    fn default() -> Self {
        Self::new(Transform::IDENTITY)
    }
}

impl MilestoneEliminator {
    /// Create an eliminator digesting prefixes under `transform`.
    #[must_use]
    pub fn new(transform: Transform) -> Self {
        Self {
            transform,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_prefix: None,
        }
    }

    /// Set the work buffer size used for prefix digests.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Skip steps longer than `max_prefix`.
    ///
    /// Used when files only need to agree on a bounded prefix: a longer step
    /// could drop files that are equal within that bound.
    #[must_use]
    pub fn with_max_prefix(mut self, max_prefix: Option<u64>) -> Self {
        self.max_prefix = max_prefix;
        self
    }

    /// Run `candidates` through `ladder`.
    ///
    /// Stops early once fewer than two candidates remain, or at the first
    /// step longer than `group_size` (when known) or the configured maximum
    /// prefix. Prefix digests are computed in parallel on the current rayon
    /// pool; a candidate that cannot be read is dropped and its error kept.
    pub fn eliminate<P: BufferPool + Sync + ?Sized>(
        &self,
        candidates: Vec<PathBuf>,
        group_size: Option<u64>,
        ladder: &Ladder,
        pool: &P,
    ) -> Elimination {
        let mut outcome = Elimination::default();
        let mut remaining = candidates;

        for &step in ladder.steps() {
            if remaining.len() < 2 {
                break;
            }
            if group_size.is_some_and(|size| step > size) {
                break;
            }
            if self.max_prefix.is_some_and(|max| step > max) {
                break;
            }

            let hasher = Hasher::new(HashAlgorithm::Xxh64)
                .with_transform(self.transform)
                .with_byte_budget(step)
                .with_buffer_size(self.buffer_size);

            let digests: Vec<Result<Digest, FileError>> = remaining
                .par_iter()
                .map(|path| hasher.digest(path, pool))
                .collect();

            let mut counts: HashMap<Digest, usize> = HashMap::with_capacity(digests.len());
            for digest in digests.iter().flatten() {
                *counts.entry(*digest).or_default() += 1;
            }

            let before = remaining.len();
            let mut survivors = Vec::with_capacity(before);
            for (path, digest) in remaining.into_iter().zip(digests) {
                match digest {
                    Ok(digest) if counts.get(&digest).copied().unwrap_or(0) >= 2 => {
                        survivors.push(path);
                    }
                    Ok(_) => {
                        log::trace!("Unique {} prefix: {}", ByteSize::b(step), path.display());
                        outcome.eliminated += 1;
                    }
                    Err(e) => {
                        log::debug!("Skipping {}: {}", path.display(), e);
                        outcome.failed.push(e);
                    }
                }
            }

            outcome.rounds += 1;
            log::debug!(
                "Milestone {}: {} → {} candidates",
                ByteSize::b(step),
                before,
                survivors.len()
            );
            remaining = survivors;
        }

        outcome.survivors = remaining;
        outcome
    }
}
