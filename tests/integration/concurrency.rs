//! Readers and rebuilds running at the same time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use crate::common::{make_site, make_tag};
use pulse::{AnalysisId, MemoryCrawlStore, SiteIndex};

/// Each store state is internally tagged with its own version, so a reader can
/// tell whether a generation mixes two states.
fn fill(store: &MemoryCrawlStore, version: i64, sites: i64) {
    for id in 1..=sites {
        store.upsert_site(make_site(id, &format!("v{}", version)));
        store.replace_tags(
            AnalysisId(id),
            vec![make_tag(id, "version", &format!("v{}", version))],
        );
    }
}

#[test]
fn test_overlapping_rebuilds_leave_one_visible_generation() {
    let store = Arc::new(MemoryCrawlStore::new());
    fill(&store, 0, 50);
    let index = Arc::new(SiteIndex::new());

    let barrier = Arc::new(Barrier::new(4));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let index = Arc::clone(&index);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                index.rebuild(store.as_ref()).unwrap().generation
            })
        })
        .collect();

    let mut generations: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    generations.sort_unstable();
    assert_eq!(generations, vec![1, 2, 3, 4]);
    assert_eq!(index.generation(), 4);
    assert_eq!(index.len(), 50);
}

#[test]
fn test_readers_never_see_a_mixed_generation() {
    let store = Arc::new(MemoryCrawlStore::new());
    fill(&store, 0, 40);
    let index = Arc::new(SiteIndex::new());
    index.rebuild(store.as_ref()).unwrap();

    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let index = Arc::clone(&index);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut checks = 0u64;
                loop {
                    let finished = done.load(Ordering::Acquire);
                    let reader = index.reader();
                    assert_eq!(reader.len(), 40, "partial generation visible");
                    let first = reader.get(AnalysisId(1)).unwrap().title.clone();
                    for record in reader.iter() {
                        assert_eq!(record.title, first, "generation mixes two store states");
                        let expected_meta = first.as_deref().map(|t| format!("version: {}", t));
                        assert_eq!(record.meta_content, expected_meta);
                    }
                    checks += 1;
                    if finished {
                        break;
                    }
                }
                checks
            })
        })
        .collect();

    for version in 1..=20 {
        let snapshot_store = MemoryCrawlStore::new();
        fill(&snapshot_store, version, 40);
        index.rebuild(&snapshot_store).unwrap();
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
    assert_eq!(index.generation(), 21);
}

#[test]
fn test_reader_held_across_many_swaps() {
    let store = MemoryCrawlStore::new();
    fill(&store, 0, 5);
    let index = SiteIndex::new();
    index.rebuild(&store).unwrap();
    let pinned = index.reader();

    for version in 1..=5 {
        fill(&store, version, 5);
        index.rebuild(&store).unwrap();
    }
    assert_eq!(pinned.generation(), 1);
    assert_eq!(
        pinned.get(AnalysisId(3)).unwrap().title.as_deref(),
        Some("v0")
    );
    assert_eq!(
        index.get(AnalysisId(3)).unwrap().title.as_deref(),
        Some("v5")
    );
}
