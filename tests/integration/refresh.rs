//! Refresh policies: write-through and periodic.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::common::{make_site, make_tag, FlakySource};
use pulse::refresh::rebuild_with_retry;
use pulse::{
    AnalysisId, CrawlSource, MemoryCrawlStore, Refresher, RetryPolicy, SiteIndex,
    WriteThroughIndex,
};

fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(4),
    }
}

fn wait_until(deadline: Duration, mut check: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    check()
}

#[test]
fn test_write_through_reflects_every_write() {
    let index = Arc::new(SiteIndex::new());
    let writer = WriteThroughIndex::new(
        Arc::new(MemoryCrawlStore::new()),
        Arc::clone(&index),
        RetryPolicy::none(),
    );

    writer.upsert_site(make_site(1, "First")).unwrap();
    writer.upsert_site(make_site(2, "Second")).unwrap();
    assert_eq!(index.len(), 2);

    writer
        .replace_tags(AnalysisId(2), vec![make_tag(2, "robots", "noindex")])
        .unwrap();
    assert_eq!(index.search("noindex", 10)[0].id, AnalysisId(2));

    writer.delete_analysis(AnalysisId(1)).unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(index.generation(), 4);
}

#[test]
fn test_retry_rides_out_transient_outage() {
    let index = SiteIndex::new();
    let source = FlakySource::new(2, vec![make_site(1, "Only")], vec![]);
    let report = rebuild_with_retry(&index, &source, &fast_retry(3)).unwrap();
    assert_eq!(report.generation, 1);
    assert_eq!(source.calls(), 3);
}

#[test]
fn test_periodic_survives_failed_rounds() {
    let index = Arc::new(SiteIndex::new());
    let source: Arc<dyn CrawlSource> =
        Arc::new(FlakySource::new(1, vec![make_site(1, "Only")], vec![]));

    let refresher = Refresher::spawn(
        Arc::clone(&index),
        source,
        Duration::from_millis(20),
        RetryPolicy::none(),
    )
    .unwrap();

    assert!(wait_until(Duration::from_secs(10), || index.generation() >= 1));
    assert!(refresher.failures() >= 1);
    assert_eq!(index.len(), 1);
    refresher.shutdown().unwrap();
}

#[test]
fn test_periodic_picks_up_store_changes() {
    let store = Arc::new(MemoryCrawlStore::new());
    store.upsert_site(make_site(1, "One"));
    let index = Arc::new(SiteIndex::new());

    let refresher = Refresher::spawn(
        Arc::clone(&index),
        store.clone(),
        Duration::from_millis(10),
        RetryPolicy::none(),
    )
    .unwrap();

    assert!(wait_until(Duration::from_secs(10), || index.len() == 1));
    store.upsert_site(make_site(2, "Two"));
    assert!(wait_until(Duration::from_secs(10), || index.len() == 2));
    drop(refresher);
}
