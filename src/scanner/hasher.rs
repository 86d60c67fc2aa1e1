//! Streaming content digests.
//!
//! # Overview
//! This module provides the [`Hasher`] struct for computing a content digest
//! of a file under one of five algorithms, after optional case folding and
//! whitespace removal, and optionally bounded to a byte budget.
//!
//! All algorithms are driven through the same init / update / finalize
//! sequence. xxHash64 is computed one-shot over the whole (transformed)
//! input, so its context buffers everything it is fed and hashes it at
//! finalization; callers see no difference.
//!
//! # Byte budget
//! The budget counts bytes that survive the transform. With whitespace
//! ignored, a budget of 256 covers the first 256 non-white bytes.

use std::fmt::{self, Write as _};
use std::fs::File;
use std::hash::{Hash, Hasher as StdHasher};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::digest::Digest as _;

use super::buffer::{BufferPool, ScratchBuffer};
use super::transform::Transform;
use super::{read_full, FileError};

/// Length of the longest supported digest (SHA256 and BLAKE3).
pub const MAX_DIGEST_LEN: usize = 32;

/// Default work buffer size in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Supported content hash algorithms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HashAlgorithm {
    /// MD5, 16 byte digest
    #[default]
    Md5,
    /// SHA-1, 20 byte digest
    Sha1,
    /// SHA-256, 32 byte digest
    Sha256,
    /// BLAKE3, 32 byte digest
    Blake3,
    /// xxHash64 with seed 0, 8 byte digest
    Xxh64,
}

impl HashAlgorithm {
    /// Every supported algorithm.
    pub const ALL: [Self; 5] = [
        Self::Md5,
        Self::Sha1,
        Self::Sha256,
        Self::Blake3,
        Self::Xxh64,
    ];

    /// Digest length in bytes.
    #[must_use]
    pub const fn digest_len(self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
            Self::Sha256 | Self::Blake3 => 32,
            Self::Xxh64 => 8,
        }
    }

    /// Canonical short name, as accepted on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Blake3 => "b3",
            Self::Xxh64 => "xxh64",
        }
    }

    /// Look an algorithm up by name (case-insensitive, long aliases accepted).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "md5" => Some(Self::Md5),
            "sha1" => Some(Self::Sha1),
            "sha256" => Some(Self::Sha256),
            "b3" | "blake3" => Some(Self::Blake3),
            "xxh64" | "xxhash64" => Some(Self::Xxh64),
            _ => None,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<HashAlgorithm> for String {
    fn from(algorithm: HashAlgorithm) -> Self {
        algorithm.name().to_string()
    }
}

/// A finished content digest.
///
/// Equality compares the algorithm and every digest byte. Hashing feeds only
/// the [folded scalar](Self::folded), so hashed containers bucket by the fold
/// and fall back to full comparison on collisions.
#[derive(Clone, Copy)]
pub struct Digest {
    algorithm: HashAlgorithm,
    bytes: [u8; MAX_DIGEST_LEN],
}

impl Digest {
    /// Build a digest from raw bytes.
    ///
    /// Returns `None` if `bytes` does not have the algorithm's digest length.
    #[must_use]
    pub fn from_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> Option<Self> {
        if bytes.len() != algorithm.digest_len() {
            return None;
        }
        let mut buf = [0u8; MAX_DIGEST_LEN];
        buf[..bytes.len()].copy_from_slice(bytes);
        Some(Self {
            algorithm,
            bytes: buf,
        })
    }

    /// Algorithm that produced this digest.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Digest bytes, exactly [`HashAlgorithm::digest_len`] long.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.algorithm.digest_len()]
    }

    /// Machine-word XOR fold of the digest bytes.
    ///
    /// Only a bucket key. Distinct digests may share a fold.
    #[must_use]
    pub fn folded(&self) -> usize {
        const WIDTH: usize = std::mem::size_of::<usize>();
        self.as_bytes()
            .iter()
            .enumerate()
            .fold(0usize, |acc, (i, &b)| acc ^ ((b as usize) << ((i % WIDTH) * 8)))
    }

    /// Lowercase hex rendering of the digest bytes.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hash_to_hex(self.as_bytes())
    }
}

impl PartialEq for Digest {
    fn eq(&self, other: &Self) -> bool {
        self.algorithm == other.algorithm && self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Digest {}

impl Hash for Digest {
    fn hash<H: StdHasher>(&self, state: &mut H) {
        state.write_usize(self.folded());
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({}:{})", self.algorithm, self.to_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Convert digest bytes to a lowercase hex string.
#[must_use]
pub fn hash_to_hex(bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

/// An algorithm context: init, update, finalize.
enum DigestContext {
    Md5(md5::Md5),
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
    Blake3(Box<blake3::Hasher>),
    /// One-shot algorithm: input is buffered until finalization.
    Xxh64(Vec<u8>),
}

impl DigestContext {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Md5 => Self::Md5(md5::Md5::new()),
            HashAlgorithm::Sha1 => Self::Sha1(sha1::Sha1::new()),
            HashAlgorithm::Sha256 => Self::Sha256(sha2::Sha256::new()),
            HashAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
            HashAlgorithm::Xxh64 => Self::Xxh64(Vec::new()),
        }
    }

    fn update(&mut self, data: &[u8]) -> Result<(), String> {
        match self {
            Self::Md5(ctx) => ctx.update(data),
            Self::Sha1(ctx) => ctx.update(data),
            Self::Sha256(ctx) => ctx.update(data),
            Self::Blake3(ctx) => {
                ctx.update(data);
            }
            Self::Xxh64(pending) => {
                pending
                    .try_reserve(data.len())
                    .map_err(|e| format!("could not buffer input: {e}"))?;
                pending.extend_from_slice(data);
            }
        }
        Ok(())
    }

    fn finalize(self) -> Digest {
        let mut bytes = [0u8; MAX_DIGEST_LEN];
        let algorithm = match self {
            Self::Md5(ctx) => {
                bytes[..16].copy_from_slice(&ctx.finalize());
                HashAlgorithm::Md5
            }
            Self::Sha1(ctx) => {
                bytes[..20].copy_from_slice(&ctx.finalize());
                HashAlgorithm::Sha1
            }
            Self::Sha256(ctx) => {
                bytes.copy_from_slice(&ctx.finalize());
                HashAlgorithm::Sha256
            }
            Self::Blake3(ctx) => {
                bytes.copy_from_slice(ctx.finalize().as_bytes());
                HashAlgorithm::Blake3
            }
            Self::Xxh64(pending) => {
                let value = xxhash_rust::xxh64::xxh64(&pending, 0);
                bytes[..8].copy_from_slice(&value.to_le_bytes());
                HashAlgorithm::Xxh64
            }
        };
        Digest { algorithm, bytes }
    }
}

/// Content digest calculator.
///
/// A `Hasher` is a small, copyable description of how to digest a file:
/// which algorithm, which transforms, how many bytes to consider and how
/// large a work buffer to request.
///
/// # Example
///
/// ```no_run
/// use ua::scanner::{HashAlgorithm, Hasher, RecyclingPool};
/// use std::path::Path;
///
/// let pool = RecyclingPool::default();
/// let hasher = Hasher::new(HashAlgorithm::Blake3)
///     .with_ignore_whitespace(true)
///     .with_byte_budget(4096);
/// let digest = hasher.digest(Path::new("a.txt"), &pool).unwrap();
/// assert_eq!(digest.as_bytes().len(), 32);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hasher {
    algorithm: HashAlgorithm,
    transform: Transform,
    byte_budget: u64,
    buffer_size: usize,
}

impl Hasher {
    /// Create a hasher with no transforms, no byte budget and the default buffer size.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            transform: Transform::IDENTITY,
            byte_budget: 0,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Set both transform flags.
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Fold ASCII letters to lower case before digesting.
    #[must_use]
    pub fn with_ignore_case(mut self, enabled: bool) -> Self {
        self.transform.ignore_case = enabled;
        self
    }

    /// Drop whitespace before digesting.
    #[must_use]
    pub fn with_ignore_whitespace(mut self, enabled: bool) -> Self {
        self.transform.ignore_whitespace = enabled;
        self
    }

    /// Consider at most `budget` post-transform bytes (0 means all).
    #[must_use]
    pub fn with_byte_budget(mut self, budget: u64) -> Self {
        self.byte_budget = budget;
        self
    }

    /// Set the requested work buffer size.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Switch to another algorithm, keeping every other setting.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// The configured algorithm.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// The configured transforms.
    #[must_use]
    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// The configured byte budget (0 means unlimited).
    #[must_use]
    pub fn byte_budget(&self) -> u64 {
        self.byte_budget
    }

    /// The requested work buffer size.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Compute the digest of the file at `path`.
    ///
    /// The work buffer is borrowed from `pool` and returned before this
    /// function exits, whether it succeeds or not.
    ///
    /// # Errors
    ///
    /// - [`FileError::Open`] if the file cannot be opened or read
    /// - [`FileError::Allocation`] if `pool` provides no buffer
    /// - [`FileError::Digest`] if the algorithm context rejects input
    pub fn digest<P: BufferPool + ?Sized>(&self, path: &Path, pool: &P) -> Result<Digest, FileError> {
        let mut file = File::open(path).map_err(|e| FileError::open(path, e))?;

        let mut buffer =
            ScratchBuffer::acquire(pool, self.buffer_size).ok_or_else(|| FileError::Allocation {
                path: path.to_path_buf(),
                requested: self.buffer_size,
            })?;
        let chunk_len = self.buffer_size.min(buffer.capacity());
        if chunk_len == 0 {
            return Err(FileError::Allocation {
                path: path.to_path_buf(),
                requested: self.buffer_size,
            });
        }

        let mut context = DigestContext::new(self.algorithm);
        let mut consumed: u64 = 0;

        loop {
            let chunk = &mut buffer[..chunk_len];
            let read = read_full(&mut file, chunk).map_err(|e| FileError::read(path, e))?;
            if read == 0 {
                break;
            }
            let at_eof = read < chunk_len;

            let mut len = self.transform.apply(&mut chunk[..read]);
            if len == 0 {
                // Nothing survived the transform.
                if at_eof {
                    break;
                }
                continue;
            }

            let mut done = at_eof;
            if self.byte_budget > 0 {
                let remaining = self.byte_budget - consumed;
                if len as u64 >= remaining {
                    len = remaining as usize;
                    done = true;
                }
                consumed += len as u64;
            }

            context
                .update(&chunk[..len])
                .map_err(|reason| FileError::Digest {
                    path: path.to_path_buf(),
                    reason,
                })?;

            if done {
                break;
            }
        }

        let digest = context.finalize();
        log::trace!(
            "{} {} of {} (budget {})",
            self.algorithm,
            digest,
            path.display(),
            self.byte_budget
        );
        Ok(digest)
    }
}
