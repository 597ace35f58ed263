//! Directory ranking through the listing stores.

use std::fs;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::NamedTempFile;

use crate::common::make_listing;
use pulse::listing::rank;
use pulse::{
    JsonListingSource, ListingId, ListingSource, ListingStatus, MemoryListingStore, PulseError,
    Vote,
};

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap()
}

fn store() -> MemoryListingStore {
    let store = MemoryListingStore::with_clock(fixed_now);
    let ten_days = fixed_now() - Duration::days(10);
    store.upsert(make_listing(1, ten_days, 20, 5, 100, false, ListingStatus::Public));
    store.upsert(make_listing(2, ten_days, 20, 5, 100, true, ListingStatus::Public));
    store.upsert(make_listing(3, ten_days, 5000, 0, 90000, true, ListingStatus::Pending));
    store.upsert(make_listing(4, fixed_now(), 0, 0, 0, false, ListingStatus::Public));
    store
}

#[test]
fn test_reference_listings() {
    let ranked = rank(&store(), None).unwrap();
    let ids: Vec<u64> = ranked.iter().map(|r| r.listing.id.0).collect();
    assert_eq!(ids, vec![2, 1, 4]);

    let plain = ranked[1].score;
    let featured = ranked[0].score;
    assert!((plain - 122.5 / 12f64.sqrt()).abs() < 1e-9);
    assert!((featured - 2.0 * plain).abs() < 1e-9);
    assert_eq!(ranked[2].score, 0.0);
}

#[test]
fn test_viewer_votes_are_annotations_only() {
    let store = store();
    store.cast_vote("ana", ListingId(4), Vote::Up).unwrap();
    store.cast_vote("bo", ListingId(1), Vote::Down).unwrap();

    let ana = rank(&store, Some("ana")).unwrap();
    let anonymous = rank(&store, None).unwrap();
    let votes: Vec<Option<Vote>> = ana.iter().map(|r| r.user_vote).collect();
    let by_id = |id: u64| ana.iter().find(|r| r.listing.id.0 == id).unwrap();

    assert_eq!(by_id(4).user_vote, Some(Vote::Up));
    assert_eq!(by_id(1).user_vote, Some(Vote::None));
    assert!(votes.iter().all(Option::is_some));
    assert!(anonymous.iter().all(|r| r.user_vote.is_none()));
    for (a, b) in ana.iter().zip(anonymous.iter()) {
        assert_eq!(a.listing.id, b.listing.id);
        assert_eq!(a.score, b.score);
    }
}

#[test]
fn test_identical_reads_give_identical_order() {
    let store = store();
    let first = rank(&store, Some("ana")).unwrap();
    for _ in 0..10 {
        assert_eq!(rank(&store, Some("ana")).unwrap(), first);
    }
}

#[test]
fn test_listing_export_file() {
    let file = NamedTempFile::new().unwrap();
    fs::write(
        file.path(),
        r#"{
            "listings": [
                {"id": 10, "name": "Old", "createdAt": "2025-01-01T00:00:00Z", "upvotes": 3, "monthlyVisits": 40, "status": "public"},
                {"id": 11, "name": "Hidden", "createdAt": "2025-01-01T00:00:00Z", "upvotes": 999, "status": "rejected"},
                {"id": 12, "name": "Broken but private", "status": "private"}
            ],
            "votes": [{"viewer": "ana", "listingId": 10, "vote": "down"}]
        }"#,
    )
    .unwrap();
    let ranked = JsonListingSource::new(file.path())
        .snapshot()
        .unwrap()
        .rank(Some("ana"))
        .unwrap();
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].listing.id, ListingId(10));
    assert_eq!(ranked[0].user_vote, Some(Vote::Down));
}

#[test]
fn test_public_listing_without_created_at_fails_call() {
    let file = NamedTempFile::new().unwrap();
    fs::write(
        file.path(),
        r#"{"listings": [{"id": 1, "status": "public"}]}"#,
    )
    .unwrap();
    let err = JsonListingSource::new(file.path())
        .snapshot()
        .unwrap()
        .rank(None)
        .unwrap_err();
    assert!(matches!(err, PulseError::InvalidInput(ref msg) if msg.contains("createdAt")));
}

#[test]
fn test_ranked_output_serializes_camel_case() {
    let ranked = rank(&store(), Some("ana")).unwrap();
    let json = serde_json::to_value(&ranked[0]).unwrap();
    assert!(json.get("userVote").is_some());
    assert!(json["listing"].get("isFeatured").is_some());
}
