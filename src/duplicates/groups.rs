//! Size bucketing and equivalence classes.
//!
//! # Overview
//!
//! Files of different sizes cannot have identical content, so when no
//! transform or byte budget can make unequal lengths compare equal, the first
//! step of a run is to stat every path and bucket it by size. Buckets holding a
//! single file are dropped without the file ever being opened.
//!
//! # Example
//!
//! ```
//! use ua::duplicates::group_by_size;
//! use std::path::PathBuf;
//!
//! let sized = vec![
//!     (PathBuf::from("/a.txt"), 100),
//!     (PathBuf::from("/b.txt"), 100),
//!     (PathBuf::from("/c.txt"), 200),
//! ];
//!
//! let (buckets, stats) = group_by_size(sized);
//!
//! assert_eq!(buckets.len(), 1);
//! assert_eq!(buckets[&100].len(), 2);
//! assert_eq!(stats.eliminated_unique, 1);
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::scanner::{file_size, Digest, FileDescriptor, FileError};

/// A set of files with identical content.
///
/// The head is the first file of the class in input order; members follow in
/// the order they were found. A class with no members is a singleton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquivalenceClass {
    /// Representative file of the class
    pub head: PathBuf,
    /// Digest shared by the class, if it was computed
    pub digest: Option<Digest>,
    /// Files found identical to the head
    pub members: Vec<PathBuf>,
}

impl EquivalenceClass {
    /// Start a class from a digested file.
    #[must_use]
    pub fn from_descriptor(descriptor: FileDescriptor) -> Self {
        let digest = *descriptor.digest();
        Self {
            head: descriptor.into_path(),
            digest: Some(digest),
            members: Vec::new(),
        }
    }

    /// A class of two files that were compared directly, without digests.
    #[must_use]
    pub fn pair(head: PathBuf, member: PathBuf) -> Self {
        Self {
            head,
            digest: None,
            members: vec![member],
        }
    }

    /// Number of files in the class, head included.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.members.len()
    }

    /// A class always holds at least its head.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether at least one file matched the head.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        !self.members.is_empty()
    }

    /// Every path in the class, head first.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.head.as_path()).chain(self.members.iter().map(PathBuf::as_path))
    }
}

/// Statistics from size bucketing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Files that were successfully stat'ed
    pub total_files: usize,
    /// Sum of their sizes in bytes
    pub total_size: u64,
    /// Number of distinct sizes seen
    pub unique_sizes: usize,
    /// Files that share their size with at least one other file
    pub potential_duplicates: usize,
    /// Files dropped because their size is unique
    pub eliminated_unique: usize,
    /// Number of buckets with two or more files
    pub duplicate_groups: usize,
}

impl GroupingStats {
    /// Percentage of files eliminated by size alone.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.eliminated_unique as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// Stat every path in parallel on the current rayon pool.
///
/// Returns the sized paths in input order, plus one [`FileError`] for every
/// path whose size could not be determined.
#[must_use]
pub fn stat_paths(paths: &[PathBuf]) -> (Vec<(PathBuf, u64)>, Vec<FileError>) {
    stat_paths_with(paths, |_| {})
}

/// [`stat_paths`], calling `on_stat` after each path is stat'ed.
///
/// `on_stat` is called from worker threads, in no particular order.
pub fn stat_paths_with<F>(paths: &[PathBuf], on_stat: F) -> (Vec<(PathBuf, u64)>, Vec<FileError>)
where
    F: Fn(&Path) + Sync + Send,
{
    let results: Vec<Result<u64, FileError>> = paths
        .par_iter()
        .map(|path| {
            let size = file_size(path);
            on_stat(path);
            size
        })
        .collect();

    let mut sized = Vec::with_capacity(paths.len());
    let mut errors = Vec::new();
    for (path, result) in paths.iter().zip(results) {
        match result {
            Ok(size) => sized.push((path.clone(), size)),
            Err(e) => {
                log::debug!("Skipping {}: {}", path.display(), e);
                errors.push(e);
            }
        }
    }
    (sized, errors)
}

/// Bucket sized paths by size.
///
/// Only buckets with two or more files are returned. The map iterates in
/// ascending size order and every bucket keeps its files in input order.
/// No file I/O is performed.
#[must_use]
pub fn group_by_size(
    sized: impl IntoIterator<Item = (PathBuf, u64)>,
) -> (BTreeMap<u64, Vec<PathBuf>>, GroupingStats) {
    let mut all_groups: BTreeMap<u64, Vec<PathBuf>> = BTreeMap::new();
    let mut stats = GroupingStats::default();

    for (path, size) in sized {
        stats.total_files += 1;
        stats.total_size += size;
        all_groups.entry(size).or_default().push(path);
    }

    stats.unique_sizes = all_groups.len();

    let buckets: BTreeMap<u64, Vec<PathBuf>> = all_groups
        .into_iter()
        .filter(|(size, files)| {
            if files.len() == 1 {
                stats.eliminated_unique += 1;
                log::trace!("Eliminated unique size {}: {}", size, files[0].display());
                false
            } else {
                stats.potential_duplicates += files.len();
                stats.duplicate_groups += 1;
                log::debug!("Size bucket {} bytes: {} candidates", size, files.len());
                true
            }
        })
        .collect();

    log::info!(
        "Size grouping complete: {} files → {} candidates ({:.1}% eliminated)",
        stats.total_files,
        stats.potential_duplicates,
        stats.elimination_rate()
    );

    (buckets, stats)
}
