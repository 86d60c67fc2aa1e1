use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;
use ua::config::RunConfig;
use ua::duplicates::{partition, partition_two_stage, DuplicateFinder, EquivalenceClass};
use ua::error::ExitCode;
use ua::scanner::{FileError, HashAlgorithm, Hasher, HeapPool, RecyclingPool};

fn create_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_missing_file_is_skipped_at_stat() {
    let dir = TempDir::new().unwrap();
    let a = create_file(&dir, "a", b"duplicate");
    let b = create_file(&dir, "b", b"duplicate");
    let missing = dir.path().join("missing");

    let (classes, summary) = DuplicateFinder::new(RunConfig::default())
        .find(vec![a.clone(), missing.clone(), b.clone()]);

    assert_eq!(classes, vec![EquivalenceClass::pair(a, b)]);
    assert_eq!(summary.skipped_files(), 1);
    assert!(matches!(summary.errors[0], FileError::Stat { .. }));
    assert_eq!(summary.errors[0].path(), missing.as_path());
    assert_eq!(ExitCode::for_summary(&summary), ExitCode::PartialSuccess);
}

#[test]
fn test_directory_is_skipped_at_stat() {
    let dir = TempDir::new().unwrap();
    let a = create_file(&dir, "a", b"x");
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();

    let (classes, summary) = DuplicateFinder::new(RunConfig::default()).find(vec![a, sub]);
    assert!(classes.is_empty());
    assert_eq!(summary.skipped_by_kind().get("stat"), Some(&1));
}

#[test]
fn test_unopenable_file_is_skipped_while_digesting() {
    let dir = TempDir::new().unwrap();
    let a = create_file(&dir, "a", b"same");
    let b = create_file(&dir, "b", b"same");
    let missing = dir.path().join("missing");

    let config = RunConfig::default().with_group_by_size(false);
    let (classes, summary) =
        DuplicateFinder::new(config).find(vec![a.clone(), missing.clone(), b.clone()]);

    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0].head, a);
    assert_eq!(classes[0].members, vec![b]);
    assert_eq!(summary.skipped_by_kind().get("open"), Some(&1));
    assert_eq!(summary.errors[0].path(), missing.as_path());
}

#[test]
fn test_unopenable_file_in_direct_comparison() {
    let dir = TempDir::new().unwrap();
    let a = create_file(&dir, "a", b"lonely");
    let missing = dir.path().join("missing");

    let config = RunConfig::default().with_group_by_size(false);
    let (classes, summary) = DuplicateFinder::new(config).find(vec![a, missing]);

    assert!(classes.is_empty());
    assert_eq!(summary.compared_directly, 2);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].kind(), "open");
}

#[test]
fn test_all_inputs_missing_yields_no_classes() {
    let dir = TempDir::new().unwrap();
    let paths: Vec<PathBuf> = (0..4).map(|i| dir.path().join(format!("gone_{i}"))).collect();

    let (classes, summary) = DuplicateFinder::new(RunConfig::default()).find(paths);
    assert!(classes.is_empty());
    assert_eq!(summary.skipped_files(), 4);
    assert_eq!(summary.classes, 0);
}

#[test]
fn test_empty_input_is_not_an_error() {
    let (classes, summary) = DuplicateFinder::new(RunConfig::default()).find(Vec::new());
    assert!(classes.is_empty());
    assert!(!summary.is_partial());
    assert_eq!(ExitCode::for_summary(&summary), ExitCode::NoDuplicates);
}

#[test]
fn test_partition_reports_failures_and_continues() {
    let dir = TempDir::new().unwrap();
    let a = create_file(&dir, "a", b"data");
    let b = create_file(&dir, "b", b"data");
    let missing = dir.path().join("missing");

    let hasher = Hasher::new(HashAlgorithm::Sha1);
    let result = partition(vec![a.clone(), missing.clone(), b.clone()], &hasher, &HeapPool);

    assert_eq!(result.classes.len(), 1);
    assert_eq!(result.classes[0].members, vec![b]);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].path(), missing.as_path());
}

#[test]
fn test_two_stage_keeps_first_stage_failures() {
    let dir = TempDir::new().unwrap();
    let a = create_file(&dir, "a", b"shared-prefix-1");
    let b = create_file(&dir, "b", b"shared-prefix-1");
    let missing = dir.path().join("missing");

    let hasher = Hasher::new(HashAlgorithm::Blake3).with_byte_budget(6);
    let result = partition_two_stage(vec![a, missing, b], &hasher, &RecyclingPool::default());

    assert_eq!(result.classes.len(), 1);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].kind(), "open");
}
