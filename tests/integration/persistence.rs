//! Snapshot files: write, reload, prune, reject corruption.

use std::fs;

use tempfile::TempDir;

use crate::common::sample_snapshot;
use pulse::index::persist::{decode_generation, encode_generation, read_snapshot, SnapshotDir};
use pulse::{AnalysisId, PulseError, RebuildOptions, SiteIndex};

#[test]
fn test_restart_serves_last_generation_before_rebuild() {
    let tmp = TempDir::new().unwrap();
    let snapshot = sample_snapshot(8);
    {
        let index = SiteIndex::open(tmp.path(), 3, RebuildOptions::default()).unwrap();
        index.rebuild(&snapshot).unwrap();
        index.rebuild(&snapshot).unwrap();
    }

    let restarted = SiteIndex::open(tmp.path(), 3, RebuildOptions::default()).unwrap();
    assert_eq!(restarted.generation(), 2);
    assert_eq!(restarted.len(), 8);
    let record = restarted.get(AnalysisId(2)).unwrap();
    assert_eq!(record.meta_content.as_deref(), Some("tag0: value 2 0 tag1: value 2 1"));
}

#[test]
fn test_prunes_to_keep() {
    let tmp = TempDir::new().unwrap();
    let snapshot = sample_snapshot(3);
    let index = SiteIndex::open(tmp.path(), 2, RebuildOptions::default()).unwrap();
    for _ in 0..5 {
        index.rebuild(&snapshot).unwrap();
    }
    let files = SnapshotDir::new(tmp.path(), 2).list().unwrap();
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["index-0000000004.pulse", "index-0000000005.pulse"]);
}

#[test]
fn test_corrupt_newest_falls_back_to_older() {
    let tmp = TempDir::new().unwrap();
    let snapshot = sample_snapshot(3);
    let newest = {
        let index = SiteIndex::open(tmp.path(), 5, RebuildOptions::default()).unwrap();
        index.rebuild(&snapshot).unwrap();
        index.rebuild(&snapshot).unwrap().persisted.unwrap()
    };

    let mut bytes = fs::read(&newest).unwrap();
    let last = bytes.len() - 12;
    bytes[last] ^= 0x55;
    fs::write(&newest, &bytes).unwrap();

    assert!(matches!(
        read_snapshot(&newest),
        Err(PulseError::CorruptSnapshot { .. })
    ));
    let restarted = SiteIndex::open(tmp.path(), 5, RebuildOptions::default()).unwrap();
    assert_eq!(restarted.generation(), 1);
}

#[test]
fn test_unwritable_snapshot_dir_does_not_block_promotion() {
    let tmp = TempDir::new().unwrap();
    let blocker = tmp.path().join("not-a-dir");
    fs::write(&blocker, b"file in the way").unwrap();

    let index = SiteIndex::open(&blocker, 2, RebuildOptions::default()).unwrap();
    let report = index.rebuild(&sample_snapshot(2)).unwrap();
    assert!(report.persisted.is_none());
    assert_eq!(index.generation(), 1);
    assert_eq!(index.len(), 2);
}

#[test]
fn test_encoded_bytes_survive_decode() {
    let index = SiteIndex::new();
    index.rebuild(&sample_snapshot(6)).unwrap();
    let generation = index.reader();
    let bytes = encode_generation(&generation).unwrap();
    let decoded = decode_generation(&bytes, "memory").unwrap();
    assert_eq!(decoded.generation(), generation.generation());
    assert!(decoded.iter().eq(generation.iter()));
}

#[test]
fn test_wrong_magic_is_corrupt() {
    let mut bytes = {
        let index = SiteIndex::new();
        index.rebuild(&sample_snapshot(1)).unwrap();
        encode_generation(&index.reader()).unwrap()
    };
    bytes[0] = b'X';
    assert!(matches!(
        decode_generation(&bytes, "memory"),
        Err(PulseError::CorruptSnapshot { .. })
    ));
}

#[test]
fn test_restart_answers_searches_like_before() {
    let tmp = TempDir::new().unwrap();
    let queries = ["site", "content of site 3", "TAG1", "value 2", "nobody"];
    let before: Vec<Vec<AnalysisId>> = {
        let index = SiteIndex::open(tmp.path(), 2, RebuildOptions::default()).unwrap();
        index.rebuild(&sample_snapshot(8)).unwrap();
        queries
            .iter()
            .map(|q| index.search(q, 50).iter().map(|r| r.id).collect())
            .collect()
    };

    let restarted = SiteIndex::open(tmp.path(), 2, RebuildOptions::default()).unwrap();
    for (query, expected) in queries.iter().zip(&before) {
        let hits: Vec<AnalysisId> = restarted.search(query, 50).iter().map(|r| r.id).collect();
        assert_eq!(&hits, expected, "query {:?}", query);
    }
    assert_eq!(before[0].len(), 8);
    assert!(before[4].is_empty());
}
