//! Duplicate detection.
//!
//! This module provides:
//! - Size bucketing and equivalence classes ([`groups`])
//! - Progressive prefix elimination ([`milestone`])
//! - Digest partitioning and two-stage refinement ([`equivalence`])
//! - The run orchestrator ([`finder`])

pub mod equivalence;
pub mod finder;
pub mod groups;
pub mod milestone;

pub use equivalence::{partition, partition_two_stage, refine, EquivalenceBuilder, Partition};
pub use finder::{DuplicateFinder, RunSummary};
pub use groups::{group_by_size, stat_paths, EquivalenceClass, GroupingStats};
pub use milestone::{Elimination, Ladder, MilestoneEliminator};
