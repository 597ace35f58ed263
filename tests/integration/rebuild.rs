//! Full rebuilds against an in-memory crawl store.

use crate::common::{assert_fragments, make_site, make_tag, sample_snapshot, tags_of, FailingSource};
use pulse::{AnalysisId, CrawlAnalysis, CrawlSource, CrawlTag, MemoryCrawlStore, PulseError, SiteIndex};

#[test]
fn test_one_record_per_site_and_no_orphans() {
    let snapshot = sample_snapshot(30);
    let index = SiteIndex::new();
    let report = index.rebuild(&snapshot).unwrap();

    assert_eq!(report.records, 30);
    assert_eq!(report.stats.orphan_tags, 1);
    let reader = index.reader();
    let ids: Vec<i64> = reader.ids().map(|id| id.get()).collect();
    assert_eq!(ids, (1..=30).collect::<Vec<_>>());
    assert!(!reader.contains(AnalysisId(1030)));

    for site in &snapshot.sites {
        let record = reader.get(site.id).unwrap();
        assert_eq!(record.url, site.url);
        assert_eq!(record.title, site.title);
        assert_eq!(record.content_text, site.content_text);
        assert_fragments(record, &tags_of(&snapshot, site.id));
    }
}

#[test]
fn test_tagless_site_has_no_meta_content() {
    let store = MemoryCrawlStore::new();
    store.upsert_site(make_site(1, "Bare"));
    let index = SiteIndex::new();
    index.rebuild(&store).unwrap();
    assert_eq!(index.get(AnalysisId(1)).unwrap().meta_content, None);
}

#[test]
fn test_two_tags_either_order() {
    let store = MemoryCrawlStore::new();
    store.upsert_site(make_site(1, "Tagged"));
    store.insert_tags(vec![make_tag(1, "A", "1"), make_tag(1, "B", "2")]);

    let index = SiteIndex::new();
    for _ in 0..2 {
        index.rebuild(&store).unwrap();
        let meta = index.get(AnalysisId(1)).unwrap().meta_content.unwrap();
        assert!(meta.contains("A: 1"));
        assert!(meta.contains("B: 2"));
        assert!(meta == "A: 1 B: 2" || meta == "B: 2 A: 1", "{:?}", meta);
    }
}

#[test]
fn test_delete_then_rebuild_removes_record() {
    let store = MemoryCrawlStore::new();
    let keep = store.save_analysis(&CrawlAnalysis {
        url: "https://keep.example".to_string(),
        meta_tags: vec![CrawlTag::new("robots", "index")],
        ..Default::default()
    });
    let gone = store.save_analysis(&CrawlAnalysis {
        url: "https://gone.example".to_string(),
        meta_tags: vec![CrawlTag::new("robots", "noindex")],
        ..Default::default()
    });

    let index = SiteIndex::new();
    index.rebuild(&store).unwrap();
    assert_eq!(index.len(), 2);

    store.delete_analysis(gone);
    index.rebuild(&store).unwrap();
    assert_eq!(index.len(), 1);
    assert!(index.get(keep).is_ok());
    assert!(matches!(index.get(gone), Err(PulseError::NotFound(id)) if id == gone));
    assert!(index.search("noindex", 10).is_empty());
}

#[test]
fn test_tags_before_site_are_picked_up_later() {
    let store = MemoryCrawlStore::new();
    store.insert_tags(vec![make_tag(5, "description", "early tag")]);
    let index = SiteIndex::new();
    index.rebuild(&store).unwrap();
    assert!(index.is_empty());

    store.upsert_site(make_site(5, "Late site"));
    index.rebuild(&store).unwrap();
    assert_eq!(
        index.get(AnalysisId(5)).unwrap().meta_content.as_deref(),
        Some("description: early tag")
    );
}

#[test]
fn test_rebuild_is_idempotent() {
    let snapshot = sample_snapshot(12);
    let index = SiteIndex::new();
    index.rebuild(&snapshot).unwrap();
    let first = index.reader();
    index.rebuild(&snapshot).unwrap();
    let second = index.reader();
    assert_eq!(first.generation() + 1, second.generation());
    assert!(first.iter().eq(second.iter()));
}

#[test]
fn test_unreachable_store_keeps_previous_generation() {
    let snapshot = sample_snapshot(4);
    let index = SiteIndex::new();
    index.rebuild(&snapshot).unwrap();

    let err = index.rebuild(&FailingSource).unwrap_err();
    assert!(matches!(err, PulseError::SourceUnavailable(_)));
    assert!(err.is_retriable());
    assert_eq!(index.generation(), 1);
    assert_eq!(index.len(), 4);
    assert!(index.get(AnalysisId(2)).is_ok());
}

#[test]
fn test_search_over_three_fields() {
    let store = MemoryCrawlStore::new();
    store.save_analysis(&CrawlAnalysis {
        url: "https://a.example".to_string(),
        title: Some("Rust Weekly".to_string()),
        content_text: Some("Newsletter about systems programming".to_string()),
        ..Default::default()
    });
    store.save_analysis(&CrawlAnalysis {
        url: "https://b.example".to_string(),
        title: Some("Garden Notes".to_string()),
        meta_tags: vec![CrawlTag::new("keywords", "rust, compost")],
        ..Default::default()
    });
    let index = SiteIndex::new();
    index.rebuild(&store).unwrap();

    assert_eq!(index.search("rust", 10).len(), 2);
    assert_eq!(index.search("systems", 10).len(), 1);
    assert_eq!(index.search("compost", 10).len(), 1);
    assert_eq!(index.search("rust newsletter", 10).len(), 1);
    assert_eq!(index.search("rust", 1).len(), 1);
    assert!(index.search("missing", 10).is_empty());
}

#[test]
fn test_snapshot_source_describes_itself() {
    let snapshot = sample_snapshot(2);
    assert!(snapshot.describe().contains("2 sites"));
}
