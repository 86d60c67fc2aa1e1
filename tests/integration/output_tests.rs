use std::fs;
use std::io::Cursor;
use std::path::PathBuf;

use tempfile::TempDir;
use ua::config::RunConfig;
use ua::duplicates::DuplicateFinder;
use ua::error::ExitCode;
use ua::output::{JsonOutput, TextOutput};

fn create_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_text_lines_from_a_run() {
    let dir = TempDir::new().unwrap();
    let a = create_file(&dir, "a.txt", b"hello");
    let b = create_file(&dir, "b.txt", b"hello");
    let c = create_file(&dir, "c.txt", b"hello");

    let config = RunConfig::default().with_report_digests(true);
    let (classes, _) = DuplicateFinder::new(config).find(vec![a.clone(), b.clone(), c.clone()]);

    let formatter = TextOutput::new().with_separator("\t").with_digest(true);
    let mut out = Vec::new();
    for class in &classes {
        formatter.write_class(&mut out, class).unwrap();
    }

    let expected = format!(
        "5d41402abc4b2a76b9719d911017c592\t{}\t{}\t{}\n",
        a.display(),
        b.display(),
        c.display()
    );
    assert_eq!(String::from_utf8(out).unwrap(), expected);
}

#[test]
fn test_text_quotes_awkward_names() {
    let dir = TempDir::new().unwrap();
    let a = create_file(&dir, "it's here", b"x");
    let b = create_file(&dir, "plain", b"x");

    let (classes, _) = DuplicateFinder::new(RunConfig::default()).find(vec![a.clone(), b.clone()]);
    let line = TextOutput::new().with_quotes(true).format_class(&classes[0]);

    let quoted_a = format!("'{}'", a.display().to_string().replace('\'', "'\\''"));
    assert_eq!(line, format!("{} '{}'", quoted_a, b.display()));
}

#[test]
fn test_json_document_from_a_run() {
    let dir = TempDir::new().unwrap();
    let a = create_file(&dir, "a", b"payload");
    let b = create_file(&dir, "b", b"payload");
    let missing = dir.path().join("missing");

    let config = RunConfig::default().with_report_digests(true);
    let (classes, summary) = DuplicateFinder::new(config).find(vec![a, b, missing]);
    let exit_code = ExitCode::for_summary(&summary);
    assert_eq!(exit_code, ExitCode::PartialSuccess);

    let mut out = Vec::new();
    JsonOutput::new(&classes, &summary, exit_code)
        .write_to(&mut out, true)
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();

    assert_eq!(parsed["classes"].as_array().unwrap().len(), 1);
    assert_eq!(parsed["classes"][0]["digest"].as_str().unwrap().len(), 32);
    assert_eq!(parsed["summary"]["input_files"], 3);
    assert_eq!(parsed["summary"]["skipped_by_kind"]["stat"], 1);
    assert_eq!(parsed["summary"]["exit_code_name"], "UA003");
}

#[test]
fn test_paths_from_stdin_feed_a_run() {
    let dir = TempDir::new().unwrap();
    let a = create_file(&dir, "a", b"listed");
    let b = create_file(&dir, "b", b"listed");

    let listing = format!("{}\n\n{}\n", a.display(), b.display());
    let paths = ua::collect_paths(&[PathBuf::from("-")], || Cursor::new(listing.into_bytes()))
        .unwrap();
    assert_eq!(paths, vec![a.clone(), b.clone()]);

    let (classes, _) = DuplicateFinder::new(RunConfig::default()).find(paths);
    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0].head, a);
}
