//! Duplicate finder orchestrating a full run.
//!
//! # Overview
//!
//! A run narrows the input down in stages, each cheaper than the next:
//!
//! 1. **Size buckets**: stat every path and bucket by size (see
//!    [`crate::duplicates::groups`]). Skipped when transforms or a final byte
//!    budget let files of different lengths match.
//! 2. **Direct comparison**: a bucket of exactly two files is settled by
//!    comparing them byte by byte, without digests. Consecutive pair buckets
//!    are compared in parallel, up to [`PAIR_BATCH`] at a time.
//! 3. **Milestones**: larger buckets are run through a ladder of prefix
//!    digests (see [`crate::duplicates::milestone`]).
//! 4. **Full digests**: survivors are digested in parallel and partitioned by
//!    digest (see [`crate::duplicates::equivalence`]).
//! 5. **Refinement**: with two-stage hashing, budget-bounded classes are split
//!    again by full content.
//!
//! Any file that cannot be stat'ed, opened, read or digested is skipped: it
//! never joins a class, and its error is kept in the [`RunSummary`].
//!
//! # Example
//!
//! ```no_run
//! use ua::config::RunConfig;
//! use ua::duplicates::DuplicateFinder;
//! use std::path::PathBuf;
//!
//! let finder = DuplicateFinder::try_new(RunConfig::default()).unwrap();
//! let paths = vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")];
//! let (classes, summary) = finder.find(paths);
//!
//! for class in &classes {
//!     println!("{} has {} copies", class.head.display(), class.members.len());
//! }
//! println!("{} files skipped", summary.skipped_files());
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use rayon::ThreadPool;

use super::equivalence::{refine, EquivalenceBuilder};
use super::groups::{group_by_size, stat_paths_with, EquivalenceClass};
use super::milestone::{Ladder, MilestoneEliminator};
use crate::config::{ConfigError, RunConfig};
use crate::progress::{ProgressCallback, PHASE_COMPARING, PHASE_SIZING};
use crate::scanner::{
    file_size, BufferPool, DirectComparator, FileDescriptor, FileError, RecyclingPool,
};

/// Most consecutive two-file buckets compared together in one parallel batch.
///
/// Classes of a batch reach the sink only once the whole batch is done.
pub const PAIR_BATCH: usize = 1024;

/// Summary of a finished run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Paths handed to the run
    pub input_files: usize,
    /// Paths ignored because they were given more than once
    pub repeated_paths: usize,
    /// Candidate buckets processed
    pub buckets: usize,
    /// Files dropped because no other file had their size
    pub eliminated_by_size: usize,
    /// Files settled by direct two-file comparison
    pub compared_directly: usize,
    /// Files dropped by a unique prefix digest
    pub eliminated_by_milestone: usize,
    /// Files digested in full (or up to the byte budget)
    pub digested_files: usize,
    /// Classes with at least one member
    pub classes: usize,
    /// Files matched to a class head
    pub duplicate_files: usize,
    /// Wall time of the run
    pub duration: Duration,
    /// Every file skipped, with the reason
    pub errors: Vec<FileError>,
}

impl RunSummary {
    /// Number of files skipped because of an error.
    #[must_use]
    pub fn skipped_files(&self) -> usize {
        self.errors.len()
    }

    /// Skipped files counted per error kind (`"open"`, `"stat"`, ...).
    #[must_use]
    pub fn skipped_by_kind(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for error in &self.errors {
            *counts.entry(error.kind()).or_default() += 1;
        }
        counts
    }

    /// Whether the run had to skip any file.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }

    fn record(&mut self, outcome: BucketOutcome) {
        self.compared_directly += outcome.compared_directly;
        self.eliminated_by_milestone += outcome.eliminated_by_milestone;
        self.digested_files += outcome.digested;
        self.classes += outcome.classes.len();
        self.duplicate_files += outcome
            .classes
            .iter()
            .map(|class| class.members.len())
            .sum::<usize>();
        self.errors.extend(outcome.failed);
    }
}

/// Files of one size (when known) that may still be identical.
struct Bucket {
    size: Option<u64>,
    files: Vec<PathBuf>,
}

impl Bucket {
    fn label(&self) -> String {
        self.files
            .first()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }
}

#[derive(Default)]
struct BucketOutcome {
    classes: Vec<EquivalenceClass>,
    compared_directly: usize,
    eliminated_by_milestone: usize,
    digested: usize,
    failed: Vec<FileError>,
}

/// Duplicate finder running the complete pipeline over a list of paths.
///
/// The buffer pool is shared by every worker thread, so it must be `Sync`.
pub struct DuplicateFinder<P = RecyclingPool> {
    config: RunConfig,
    pool: P,
    ladder: Option<Ladder>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl DuplicateFinder {
    /// Create a finder using a [`RecyclingPool`].
    ///
    /// The configuration is used as is; call [`RunConfig::validate`] first
    /// or use [`try_new`](Self::try_new).
    #[must_use]
    pub fn new(config: RunConfig) -> Self {
        Self::with_pool(config, RecyclingPool::default())
    }

    /// Validate `config` and create a finder using a [`RecyclingPool`].
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] from [`RunConfig::validate`].
    pub fn try_new(config: RunConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config))
    }
}

impl<P: BufferPool + Sync> DuplicateFinder<P> {
    /// Create a finder drawing work buffers from `pool`.
    #[must_use]
    pub fn with_pool(config: RunConfig, pool: P) -> Self {
        Self {
            config,
            pool,
            ladder: None,
            progress_callback: None,
        }
    }

    /// Report progress to `callback`.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Use `ladder` for every bucket instead of the size-dependent default.
    #[must_use]
    pub fn with_ladder(mut self, ladder: Ladder) -> Self {
        self.ladder = Some(ladder);
        self
    }

    /// The configuration of this finder.
    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Find every class of identical files among `paths`.
    ///
    /// Classes are returned bucket by bucket, in ascending size order when
    /// size bucketing is on. Only classes with members are returned.
    #[must_use]
    pub fn find(&self, paths: Vec<PathBuf>) -> (Vec<EquivalenceClass>, RunSummary) {
        let mut classes = Vec::new();
        let summary = self.find_with(paths, |class| classes.push(class.clone()));
        (classes, summary)
    }

    /// Find every class of identical files among `paths`, handing each class
    /// to `sink` as soon as its bucket is finished.
    pub fn find_with<F>(&self, paths: Vec<PathBuf>, mut sink: F) -> RunSummary
    where
        F: FnMut(&EquivalenceClass),
    {
        let start = Instant::now();
        let mut summary = RunSummary {
            input_files: paths.len(),
            ..RunSummary::default()
        };

        let paths = unique_paths(paths, &mut summary);
        log::info!("Comparing {} paths", paths.len());

        let executor = self.build_thread_pool();
        let executor = executor.as_ref();

        let buckets = self.collect_buckets(paths, executor, &mut summary);
        summary.buckets = buckets.len();

        self.phase_start(PHASE_COMPARING, buckets.len());
        let mut done = 0;
        let mut buckets = buckets.into_iter().peekable();
        while let Some(first) = buckets.next() {
            let mut batch = vec![first];
            if self.settles_directly(&batch[0]) {
                while batch.len() < PAIR_BATCH {
                    match buckets.next_if(|next| self.settles_directly(next)) {
                        Some(next) => batch.push(next),
                        None => break,
                    }
                }
            }

            let labels: Vec<String> = batch.iter().map(Bucket::label).collect();
            let outcomes: Vec<BucketOutcome> = install(executor, || {
                batch
                    .into_par_iter()
                    .map(|bucket| self.process_bucket(bucket))
                    .collect()
            });

            for (outcome, label) in outcomes.into_iter().zip(labels) {
                for class in &outcome.classes {
                    sink(class);
                }
                summary.record(outcome);
                done += 1;
                if let Some(ref callback) = self.progress_callback {
                    callback.on_progress(done, &label);
                }
            }
        }
        self.phase_end(PHASE_COMPARING);

        summary.duration = start.elapsed();
        log::info!(
            "Run complete: {} classes, {} duplicate files, {} skipped in {:.2?}",
            summary.classes,
            summary.duplicate_files,
            summary.skipped_files(),
            summary.duration
        );
        summary
    }

    fn build_thread_pool(&self) -> Option<ThreadPool> {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()
        {
            Ok(pool) => Some(pool),
            Err(e) => {
                log::warn!(
                    "Failed to create thread pool ({}), using global pool with {} threads",
                    e,
                    rayon::current_num_threads()
                );
                None
            }
        }
    }

    fn collect_buckets(
        &self,
        paths: Vec<PathBuf>,
        executor: Option<&ThreadPool>,
        summary: &mut RunSummary,
    ) -> Vec<Bucket> {
        if !self.config.size_grouping_active() {
            log::debug!("Size bucketing disabled, comparing all paths as one bucket");
            if paths.len() < 2 {
                return Vec::new();
            }
            return vec![Bucket {
                size: None,
                files: paths,
            }];
        }

        self.phase_start(PHASE_SIZING, paths.len());
        let done = AtomicUsize::new(0);
        let (sized, errors) = install(executor, || {
            stat_paths_with(&paths, |path| {
                let current = done.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(ref callback) = self.progress_callback {
                    callback.on_progress(current, &path.to_string_lossy());
                }
            })
        });
        self.phase_end(PHASE_SIZING);

        summary.errors.extend(errors);
        let (groups, stats) = group_by_size(sized);
        summary.eliminated_by_size = stats.eliminated_unique;

        groups
            .into_iter()
            .map(|(size, files)| Bucket {
                size: Some(size),
                files,
            })
            .collect()
    }

    fn process_bucket(&self, bucket: Bucket) -> BucketOutcome {
        let mut outcome = BucketOutcome::default();
        let config = &self.config;
        let transform = config.transform();

        if bucket.files.len() < 2 {
            return outcome;
        }

        if self.settles_directly(&bucket) {
            let budget = if config.two_stage { 0 } else { config.byte_budget };
            let comparator = DirectComparator::new(transform)
                .with_byte_budget(budget)
                .with_buffer_size(config.buffer_size);
            let (a, b) = (&bucket.files[0], &bucket.files[1]);
            outcome.compared_directly = 2;
            match comparator.equal(a, b, &self.pool) {
                Ok(true) => {
                    let mut files = bucket.files.into_iter();
                    if let (Some(head), Some(member)) = (files.next(), files.next()) {
                        outcome.classes.push(EquivalenceClass::pair(head, member));
                    }
                }
                Ok(false) => {}
                Err(e) => {
                    log::debug!("Skipping {}: {}", e.path().display(), e);
                    outcome.failed.push(e);
                }
            }
            return outcome;
        }

        let candidates = if config.milestone {
            let group_size = bucket
                .size
                .or_else(|| bucket.files.first().and_then(|p| file_size(p).ok()));
            let ladder = match self.ladder {
                Some(ref ladder) => ladder.clone(),
                None => Ladder::for_size(group_size.unwrap_or(0)),
            };
            let max_prefix = config.budget_is_final().then_some(config.byte_budget);
            let candidates = bucket.files.len();

            let result = MilestoneEliminator::new(transform)
                .with_buffer_size(config.buffer_size)
                .with_max_prefix(max_prefix)
                .eliminate(bucket.files, group_size, &ladder, &self.pool);

            outcome.eliminated_by_milestone = result.eliminated;
            if let Some(ref callback) = self.progress_callback {
                callback.on_message(&format!(
                    "{} of {} candidates left after {} milestones",
                    result.survivors.len(),
                    candidates,
                    result.rounds
                ));
            }
            outcome.failed.extend(result.failed);
            if result.survivors.len() < 2 {
                return outcome;
            }
            result.survivors
        } else {
            bucket.files
        };

        let hasher = config.hasher();
        let descriptors: Vec<Result<FileDescriptor, FileError>> = candidates
            .into_par_iter()
            .map(|path| FileDescriptor::compute(path, &hasher, &self.pool))
            .collect();
        outcome.digested = descriptors.len();

        let mut builder = EquivalenceBuilder::new(hasher, &self.pool);
        for descriptor in descriptors {
            match descriptor {
                Ok(descriptor) => builder.insert(descriptor),
                Err(e) => {
                    log::debug!("Skipping {}: {}", e.path().display(), e);
                    outcome.failed.push(e);
                }
            }
        }
        let coarse = builder.duplicate_classes();

        if config.two_stage && !coarse.is_empty() {
            let refined = refine(coarse, &hasher, &self.pool);
            outcome.failed.extend(refined.failed);
            outcome.classes = refined.classes;
        } else {
            outcome.classes = coarse;
        }
        outcome
    }

    fn settles_directly(&self, bucket: &Bucket) -> bool {
        bucket.files.len() == 2 && !self.config.report_digests
    }

    fn phase_start(&self, phase: &str, total: usize) {
        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start(phase, total);
        }
    }

    fn phase_end(&self, phase: &str) {
        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end(phase);
        }
    }
}

/// Drop repeated paths, keeping the first occurrence of each.
fn unique_paths(paths: Vec<PathBuf>, summary: &mut RunSummary) -> Vec<PathBuf> {
    let mut seen = HashSet::with_capacity(paths.len());
    let mut unique = Vec::with_capacity(paths.len());
    for path in paths {
        if seen.contains(&path) {
            log::debug!("Ignoring repeated path {}", path.display());
            summary.repeated_paths += 1;
        } else {
            seen.insert(path.clone());
            unique.push(path);
        }
    }
    unique
}

fn install<R: Send>(executor: Option<&ThreadPool>, op: impl FnOnce() -> R + Send) -> R {
    match executor {
        Some(pool) => pool.install(op),
        None => op(),
    }
}
