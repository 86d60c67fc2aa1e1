//! Scanner module for file content identity.
//!
//! This module provides functionality for:
//! - Content digesting under several algorithms (MD5, SHA1, SHA256, BLAKE3, xxHash64)
//! - Letter-case and whitespace insensitive transforms
//! - Direct two-file comparison without digesting
//! - Scratch buffer pools for single-threaded and concurrent use
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`buffer`]: Work buffer allocation strategies
//! - [`transform`]: In-place case folding and whitespace compaction
//! - [`hasher`]: Streaming digest computation
//! - [`descriptor`]: Immutable path + digest records
//! - [`compare`]: Byte-exact (optionally fuzzy) two-file equality
//!
//! # Example
//!
//! ```no_run
//! use ua::scanner::{HashAlgorithm, Hasher, HeapPool};
//! use std::path::Path;
//!
//! let hasher = Hasher::new(HashAlgorithm::Sha256).with_ignore_case(true);
//! let digest = hasher.digest(Path::new("notes.txt"), &HeapPool).unwrap();
//! println!("{}", digest.to_hex());
//! ```

pub mod buffer;
pub mod compare;
pub mod descriptor;
pub mod hasher;
pub mod transform;

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// Re-export main types
pub use buffer::{BufferPool, HeapPool, RecyclingPool, ScratchBuffer, SingleBufferPool};
pub use compare::{files_equal, DirectComparator};
pub use descriptor::FileDescriptor;
pub use hasher::{hash_to_hex, Digest, HashAlgorithm, Hasher, MAX_DIGEST_LEN};
pub use transform::Transform;

/// Errors that can occur while examining a single file.
///
/// Every variant excludes the file from further consideration; none of
/// them aborts a run.
#[derive(thiserror::Error, Debug, Clone)]
pub enum FileError {
    /// The file could not be opened or read.
    #[error("Could not {action} {path}: {source}")]
    Open {
        /// Path where the error occurred
        path: PathBuf,
        /// What was being attempted ("open" or "read")
        action: &'static str,
        /// The underlying I/O error
        #[source]
        source: Arc<io::Error>,
    },

    /// The file size could not be determined.
    #[error("Could not stat {path}: {reason}")]
    Stat {
        /// Path where the error occurred
        path: PathBuf,
        /// Why the size is unavailable
        reason: String,
    },

    /// No usable work buffer could be obtained.
    #[error("Could not allocate a {requested} byte work buffer for {path}")]
    Allocation {
        /// Path being processed when the allocation failed
        path: PathBuf,
        /// Requested buffer capacity in bytes
        requested: usize,
    },

    /// The digest context failed to accept input or produce output.
    #[error("Hash calculation failed for {path}: {reason}")]
    Digest {
        /// Path being digested
        path: PathBuf,
        /// Failure description
        reason: String,
    },
}

impl FileError {
    /// Path of the file this error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Open { path, .. }
            | Self::Stat { path, .. }
            | Self::Allocation { path, .. }
            | Self::Digest { path, .. } => path,
        }
    }

    /// Short machine-readable name of the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Open { .. } => "open",
            Self::Stat { .. } => "stat",
            Self::Allocation { .. } => "allocation",
            Self::Digest { .. } => "digest",
        }
    }

    pub(crate) fn open(path: &Path, source: io::Error) -> Self {
        Self::Open {
            path: path.to_path_buf(),
            action: "open",
            source: Arc::new(source),
        }
    }

    pub(crate) fn read(path: &Path, source: io::Error) -> Self {
        Self::Open {
            path: path.to_path_buf(),
            action: "read",
            source: Arc::new(source),
        }
    }
}

/// Get a file's size from the file system.
///
/// Symbolic links are followed. Anything that is not a regular file
/// after following links is rejected.
///
/// # Errors
///
/// Returns [`FileError::Stat`] if the metadata cannot be read or the path
/// does not name a regular file.
pub fn file_size(path: &Path) -> Result<u64, FileError> {
    let metadata = fs::metadata(path).map_err(|e| FileError::Stat {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if !metadata.is_file() {
        return Err(FileError::Stat {
            path: path.to_path_buf(),
            reason: "not a regular file".to_string(),
        });
    }

    Ok(metadata.len())
}

/// Fill `buf` from `reader`, stopping early only at end of file.
///
/// Short reads are retried so callers see full chunks until the last one.
/// Returns the number of bytes placed in `buf`.
pub(crate) fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
