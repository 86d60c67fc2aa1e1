//! Partitioning files into equivalence classes by digest.
//!
//! An [`EquivalenceBuilder`] consumes paths one at a time. Each file is
//! digested once; if its digest matches an existing class head it joins that
//! class, otherwise it becomes the head of a new class. The first file added
//! with a given digest is always the head.
//!
//! When the digests were bounded by a byte budget, the classes only say that
//! files agree on a prefix. [`refine`] splits such coarse classes by digesting
//! their files again in full.

use std::collections::HashMap;
use std::path::PathBuf;

use rayon::prelude::*;

use super::groups::EquivalenceClass;
use crate::scanner::{BufferPool, Digest, FileDescriptor, FileError, Hasher};

/// Incrementally builds a partition of files by content digest.
pub struct EquivalenceBuilder<'p, P: BufferPool + ?Sized> {
    hasher: Hasher,
    pool: &'p P,
    heads: HashMap<Digest, usize>,
    classes: Vec<EquivalenceClass>,
}

impl<'p, P: BufferPool + ?Sized> EquivalenceBuilder<'p, P> {
    /// Create an empty builder digesting with `hasher`.
    #[must_use]
    pub fn new(hasher: Hasher, pool: &'p P) -> Self {
        Self {
            hasher,
            pool,
            heads: HashMap::new(),
            classes: Vec::new(),
        }
    }

    /// Digest the file at `path` and place it in its class.
    ///
    /// # Errors
    ///
    /// Returns the [`FileError`] if the file cannot be digested. The file is
    /// then left out of the partition and the builder is unchanged.
    pub fn add(&mut self, path: impl Into<PathBuf>) -> Result<(), FileError> {
        let descriptor = FileDescriptor::compute(path, &self.hasher, self.pool)?;
        self.insert(descriptor);
        Ok(())
    }

    /// Place an already digested file in its class.
    pub fn insert(&mut self, descriptor: FileDescriptor) {
        match self.heads.get(descriptor.digest()) {
            Some(&index) => {
                log::trace!(
                    "{} matches {}",
                    descriptor.path().display(),
                    self.classes[index].head.display()
                );
                self.classes[index].members.push(descriptor.into_path());
            }
            None => {
                self.heads.insert(*descriptor.digest(), self.classes.len());
                self.classes.push(EquivalenceClass::from_descriptor(descriptor));
            }
        }
    }

    /// Hasher the builder digests with.
    #[must_use]
    pub fn hasher(&self) -> &Hasher {
        &self.hasher
    }

    /// Every class so far, singletons included, in order of first appearance.
    #[must_use]
    pub fn classes(&self) -> &[EquivalenceClass] {
        &self.classes
    }

    /// Number of classes so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether nothing has been added yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Consume the builder, returning the full partition.
    #[must_use]
    pub fn into_classes(self) -> Vec<EquivalenceClass> {
        self.classes
    }

    /// Consume the builder, returning only classes with members.
    #[must_use]
    pub fn duplicate_classes(self) -> Vec<EquivalenceClass> {
        self.classes
            .into_iter()
            .filter(EquivalenceClass::is_duplicate)
            .collect()
    }
}

/// Classes produced by a partitioning pass, plus the files it had to skip.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    /// Classes with at least one member
    pub classes: Vec<EquivalenceClass>,
    /// Files that could not be digested
    pub failed: Vec<FileError>,
}

impl Partition {
    fn absorb(&mut self, other: Partition) {
        self.classes.extend(other.classes);
        self.failed.extend(other.failed);
    }
}

/// Partition `paths` by their digest under `hasher`.
///
/// Files that cannot be digested are skipped and their errors returned.
pub fn partition<P: BufferPool + ?Sized>(
    paths: impl IntoIterator<Item = PathBuf>,
    hasher: &Hasher,
    pool: &P,
) -> Partition {
    let mut builder = EquivalenceBuilder::new(*hasher, pool);
    let mut failed = Vec::new();
    for path in paths {
        if let Err(e) = builder.add(path) {
            log::debug!("Skipping {}: {}", e.path().display(), e);
            failed.push(e);
        }
    }
    Partition {
        classes: builder.duplicate_classes(),
        failed,
    }
}

/// Split coarse classes by full content.
///
/// Every class with members is partitioned again with `hasher` and no byte
/// budget, independently of the others and in parallel on the current rayon
/// pool. Singletons are dropped. Refined classes come out in the order of
/// their coarse classes.
pub fn refine<P: BufferPool + Sync + ?Sized>(
    coarse: Vec<EquivalenceClass>,
    hasher: &Hasher,
    pool: &P,
) -> Partition {
    let full = hasher.with_byte_budget(0);
    let refined: Vec<Partition> = coarse
        .into_par_iter()
        .filter(EquivalenceClass::is_duplicate)
        .map(|class| {
            let EquivalenceClass { head, members, .. } = class;
            partition(std::iter::once(head).chain(members), &full, pool)
        })
        .collect();

    let mut result = Partition::default();
    for part in refined {
        result.absorb(part);
    }
    log::debug!("Refinement complete: {} classes", result.classes.len());
    result
}

/// Partition `paths` under a byte-bounded `hasher`, then [`refine`] the result.
///
/// The outcome is the same partition a single full-content pass would give,
/// but files that differ early are only read up to the budget.
pub fn partition_two_stage<P: BufferPool + Sync + ?Sized>(
    paths: impl IntoIterator<Item = PathBuf>,
    hasher: &Hasher,
    pool: &P,
) -> Partition {
    let coarse = partition(paths, hasher, pool);
    let mut refined = refine(coarse.classes, hasher, pool);
    let mut failed = coarse.failed;
    failed.append(&mut refined.failed);
    refined.failed = failed;
    refined
}
