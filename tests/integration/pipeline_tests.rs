use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use tempfile::TempDir;
use ua::config::RunConfig;
use ua::duplicates::{
    DuplicateFinder, EquivalenceBuilder, EquivalenceClass, Ladder, MilestoneEliminator,
};
use ua::scanner::{BufferPool, HashAlgorithm, Hasher, HeapPool, Transform};

const MIB: usize = 1024 * 1024;

fn create_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Every class as a sorted list of paths, classes sorted by head.
fn normalize(classes: &[EquivalenceClass]) -> Vec<Vec<PathBuf>> {
    let mut sets: Vec<Vec<PathBuf>> = classes
        .iter()
        .map(|class| {
            let mut paths: Vec<PathBuf> = class.paths().map(Path::to_path_buf).collect();
            paths.sort();
            paths
        })
        .collect();
    sets.sort();
    sets
}

/// Pool counting every acquisition.
#[derive(Default)]
struct CountingPool {
    acquired: AtomicUsize,
}

impl BufferPool for CountingPool {
    fn acquire(&self, capacity: usize) -> Option<Vec<u8>> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        HeapPool.acquire(capacity)
    }

    fn release(&self, _buffer: Vec<u8>) {}
}

fn config() -> RunConfig {
    RunConfig::default().with_threads(2)
}

fn hello_files(dir: &TempDir) -> (PathBuf, PathBuf, PathBuf) {
    (
        create_file(dir, "a", b"hello\n"),
        create_file(dir, "b", b"HELLO\n"),
        create_file(dir, "c", b"hello \n"),
    )
}

#[test]
fn test_case_and_whitespace_builder_classes() {
    let dir = TempDir::new().unwrap();
    let (a, b, c) = hello_files(&dir);
    let inputs = [a.clone(), b.clone(), c.clone()];

    let classes_with = |hasher: Hasher| {
        let mut builder = EquivalenceBuilder::new(hasher, &HeapPool);
        for path in &inputs {
            builder.add(path.clone()).unwrap();
        }
        normalize(&builder.into_classes())
    };

    let exact = Hasher::new(HashAlgorithm::Md5);
    assert_eq!(
        classes_with(exact),
        vec![vec![a.clone()], vec![b.clone()], vec![c.clone()]]
    );

    let no_case = exact.with_ignore_case(true);
    assert_eq!(
        classes_with(no_case),
        vec![vec![a.clone(), b.clone()], vec![c.clone()]]
    );

    let no_case_no_space = no_case.with_ignore_whitespace(true);
    assert_eq!(classes_with(no_case_no_space), vec![vec![a, b, c]]);
}

#[test]
fn test_case_and_whitespace_full_run() {
    let dir = TempDir::new().unwrap();
    let (a, b, c) = hello_files(&dir);
    let inputs = vec![a.clone(), b.clone(), c.clone()];

    let (classes, summary) = DuplicateFinder::new(config()).find(inputs.clone());
    assert!(classes.is_empty());
    assert_eq!(summary.classes, 0);

    let (classes, _) = DuplicateFinder::new(config().with_ignore_case(true)).find(inputs.clone());
    assert_eq!(normalize(&classes), vec![vec![a.clone(), b.clone()]]);

    let (classes, summary) = DuplicateFinder::new(
        config().with_ignore_case(true).with_ignore_whitespace(true),
    )
    .find(inputs);
    assert_eq!(normalize(&classes), vec![vec![a.clone(), b, c]]);
    assert_eq!(classes[0].head, a);
    assert_eq!(summary.duplicate_files, 2);
}

fn diverging_pair(dir: &TempDir) -> (PathBuf, PathBuf) {
    let first = vec![7u8; 5 * MIB];
    let mut second = first.clone();
    second[4 * MIB + 10] = 8;
    (
        create_file(dir, "first.bin", &first),
        create_file(dir, "second.bin", &second),
    )
}

#[test]
fn test_late_divergence_caught_by_larger_milestone() {
    let dir = TempDir::new().unwrap();
    let (a, b) = diverging_pair(&dir);
    let ladder = Ladder::custom([MIB as u64, 4 * MIB as u64, 5 * MIB as u64]);

    let result = MilestoneEliminator::default()
        .with_buffer_size(64 * 1024)
        .eliminate(
            vec![a.clone(), b.clone()],
            Some(5 * MIB as u64),
            &ladder,
            &HeapPool,
        );
    assert_eq!(result.rounds, 3);
    assert!(result.survivors.is_empty());

    let survivors = MilestoneEliminator::default()
        .with_buffer_size(64 * 1024)
        .eliminate(
            vec![a.clone(), b.clone()],
            Some(5 * MIB as u64),
            &Ladder::custom([4 * MIB as u64]),
            &HeapPool,
        )
        .survivors;
    assert_eq!(survivors, vec![a.clone(), b.clone()]);

    // Digests are requested so the pair goes through the ladder.
    let run_config = config().with_report_digests(true).with_buffer_size(64 * 1024);
    let (classes, summary) = DuplicateFinder::new(run_config.clone())
        .with_ladder(ladder)
        .find(vec![a.clone(), b.clone()]);
    assert!(classes.is_empty());
    assert_eq!(summary.eliminated_by_milestone, 2);
    assert_eq!(summary.digested_files, 0);

    let (classes, summary) =
        DuplicateFinder::new(run_config.with_milestone(false)).find(vec![a, b]);
    assert!(classes.is_empty());
    assert_eq!(summary.eliminated_by_milestone, 0);
    assert_eq!(summary.digested_files, 2);
}

#[test]
fn test_lone_size_bucket_is_never_read() {
    let dir = TempDir::new().unwrap();
    let paths = vec![
        create_file(&dir, "one", b"1"),
        create_file(&dir, "two", b"22"),
        create_file(&dir, "three", b"333"),
    ];

    let pool = CountingPool::default();
    let (classes, summary) = DuplicateFinder::with_pool(config(), &pool).find(paths);

    assert!(classes.is_empty());
    assert_eq!(summary.buckets, 0);
    assert_eq!(summary.eliminated_by_size, 3);
    assert_eq!(pool.acquired.load(Ordering::SeqCst), 0);
}

#[test]
fn test_pair_bucket_uses_direct_comparison() {
    let dir = TempDir::new().unwrap();
    let a = create_file(&dir, "a", b"same content");
    let b = create_file(&dir, "b", b"same content");

    let (classes, summary) = DuplicateFinder::new(config()).find(vec![a.clone(), b.clone()]);
    assert_eq!(classes, vec![EquivalenceClass::pair(a.clone(), b.clone())]);
    assert!(classes[0].digest.is_none());
    assert_eq!(summary.compared_directly, 2);
    assert_eq!(summary.digested_files, 0);

    let expected = Hasher::new(HashAlgorithm::Md5).digest(&a, &HeapPool).unwrap();
    let (classes, summary) =
        DuplicateFinder::new(config().with_report_digests(true)).find(vec![a, b]);
    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0].digest, Some(expected));
    assert_eq!(summary.compared_directly, 0);
    assert_eq!(summary.digested_files, 2);
}

#[test]
fn test_classes_stream_in_size_order() {
    let dir = TempDir::new().unwrap();
    let big_a = create_file(&dir, "big_a", b"0123456789");
    let big_b = create_file(&dir, "big_b", b"0123456789");
    let small_a = create_file(&dir, "small_a", b"xy");
    let small_b = create_file(&dir, "small_b", b"xy");
    let small_c = create_file(&dir, "small_c", b"xy");

    let mut heads = Vec::new();
    let summary = DuplicateFinder::new(config()).find_with(
        vec![big_a.clone(), small_a.clone(), big_b, small_b, small_c],
        |class| heads.push(class.head.clone()),
    );

    assert_eq!(heads, vec![small_a, big_a]);
    assert_eq!(summary.buckets, 2);
    assert_eq!(summary.duplicate_files, 3);
}

#[test]
fn test_two_stage_confirms_full_content() {
    let dir = TempDir::new().unwrap();
    let a = create_file(&dir, "a", b"prefix-AAAA");
    let b = create_file(&dir, "b", b"prefix-BBBB");
    let c = create_file(&dir, "c", b"prefix-AAAA");

    let run_config = config().with_byte_budget(6).with_two_stage(true);
    let (classes, _) = DuplicateFinder::try_new(run_config)
        .unwrap()
        .find(vec![a.clone(), b, c.clone()]);
    assert_eq!(normalize(&classes), vec![vec![a, c]]);
}

#[test]
fn test_final_budget_matches_on_prefix_only() {
    let dir = TempDir::new().unwrap();
    let a = create_file(&dir, "a", b"abcdXX");
    let b = create_file(&dir, "b", b"abcdYYYYYY");
    let c = create_file(&dir, "c", b"zzzz");

    let (classes, summary) = DuplicateFinder::new(config().with_byte_budget(4))
        .find(vec![a.clone(), b.clone(), c]);
    assert_eq!(normalize(&classes), vec![vec![a, b]]);
    assert_eq!(summary.eliminated_by_size, 0);
}

#[test]
fn test_ignore_whitespace_matches_across_sizes() {
    let dir = TempDir::new().unwrap();
    let a = create_file(&dir, "a", b"fn main() {}\n");
    let b = create_file(&dir, "b", b"fn   main()\t{ }\r\n\r\n");

    let (classes, _) = DuplicateFinder::new(config().with_ignore_whitespace(true))
        .find(vec![a.clone(), b.clone()]);
    assert_eq!(classes, vec![EquivalenceClass::pair(a, b)]);
}

#[test]
fn test_disabled_size_groups_still_partition() {
    let dir = TempDir::new().unwrap();
    let a = create_file(&dir, "a", b"alpha");
    let b = create_file(&dir, "b", b"beta");
    let c = create_file(&dir, "c", b"alpha");
    let d = create_file(&dir, "d", b"beta");

    let (classes, summary) = DuplicateFinder::new(config().with_group_by_size(false))
        .find(vec![a.clone(), b.clone(), c.clone(), d.clone()]);
    assert_eq!(normalize(&classes), vec![vec![a, c], vec![b, d]]);
    assert_eq!(summary.buckets, 1);
    assert_eq!(summary.eliminated_by_size, 0);
}

#[test]
fn test_every_algorithm_agrees_on_classes() {
    let dir = TempDir::new().unwrap();
    let a = create_file(&dir, "a", b"payload one");
    let b = create_file(&dir, "b", b"payload two");
    let c = create_file(&dir, "c", b"payload one");

    for algorithm in HashAlgorithm::ALL {
        let run_config = config().with_algorithm(algorithm).with_report_digests(true);
        let (classes, _) =
            DuplicateFinder::new(run_config).find(vec![a.clone(), b.clone(), c.clone()]);
        assert_eq!(normalize(&classes), vec![vec![a.clone(), c.clone()]], "{algorithm}");
        let digest = classes[0].digest.unwrap();
        assert_eq!(digest.algorithm(), algorithm);
        assert_eq!(digest.as_bytes().len(), algorithm.digest_len());
    }
}

#[test]
fn test_repeated_paths_are_compared_once() {
    let dir = TempDir::new().unwrap();
    let a = create_file(&dir, "a", b"twin");
    let b = create_file(&dir, "b", b"twin");

    let (classes, summary) =
        DuplicateFinder::new(config()).find(vec![a.clone(), a.clone(), b.clone()]);
    assert_eq!(classes, vec![EquivalenceClass::pair(a, b)]);
    assert_eq!(summary.input_files, 3);
    assert_eq!(summary.repeated_paths, 1);
}

#[test]
fn test_empty_files_form_a_class() {
    let dir = TempDir::new().unwrap();
    let a = create_file(&dir, "a", b"");
    let b = create_file(&dir, "b", b"");
    let c = create_file(&dir, "c", b"");

    let (classes, _) = DuplicateFinder::new(config()).find(vec![a.clone(), b.clone(), c.clone()]);
    assert_eq!(normalize(&classes), vec![vec![a, b, c]]);
}

#[test]
fn test_transform_identity_on_default_config() {
    assert!(config().transform().is_identity());
    assert_eq!(
        config().with_ignore_case(true).transform(),
        Transform::new(true, false)
    );
}
