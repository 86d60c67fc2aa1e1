//! Path + digest records.

use std::path::{Path, PathBuf};

use super::buffer::BufferPool;
use super::hasher::{Digest, HashAlgorithm, Hasher};
use super::transform::Transform;
use super::FileError;

/// A file together with its fully computed content digest.
///
/// The digest is computed once, at construction. Two descriptors are equal
/// when their digests are equal; the paths play no part.
#[derive(Debug, Clone)]
pub struct FileDescriptor {
    path: PathBuf,
    digest: Digest,
    transform: Transform,
    byte_budget: u64,
}

impl FileDescriptor {
    /// Digest the file at `path` with `hasher`.
    ///
    /// # Errors
    ///
    /// Propagates any [`FileError`] from [`Hasher::digest`].
    pub fn compute<P: BufferPool + ?Sized>(
        path: impl Into<PathBuf>,
        hasher: &Hasher,
        pool: &P,
    ) -> Result<Self, FileError> {
        let path = path.into();
        let digest = hasher.digest(&path, pool)?;
        Ok(Self {
            path,
            digest,
            transform: hasher.transform(),
            byte_budget: hasher.byte_budget(),
        })
    }

    /// Path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Consume the descriptor, keeping only the path.
    #[must_use]
    pub fn into_path(self) -> PathBuf {
        self.path
    }

    /// The content digest.
    #[must_use]
    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    /// Algorithm used for the digest.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.digest.algorithm()
    }

    /// Transforms applied before digesting.
    #[must_use]
    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Byte budget the digest was bounded to (0 means whole file).
    #[must_use]
    pub fn byte_budget(&self) -> u64 {
        self.byte_budget
    }
}

impl PartialEq for FileDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.digest == other.digest
    }
}

impl Eq for FileDescriptor {}

impl std::hash::Hash for FileDescriptor {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::hash::Hash::hash(&self.digest, state);
    }
}
