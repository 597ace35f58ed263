// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Fuzz target for ranking invariants.
//!
//! Arbitrary counts, ages and statuses go in. Either the call rejects a listing
//! with `InvalidInput`, or every score is finite and the order is sorted and
//! reproducible. No NaN, no panic, no order that depends on input order.

#![no_main]

use std::collections::HashMap;

use arbitrary::Arbitrary;
use chrono::{Duration, TimeZone, Utc};
use libfuzzer_sys::fuzz_target;
use pulse::scoring::compare_ranked;
use pulse::testing::make_listing;
use pulse::{rank_listings, ListingId, ListingStatus, PulseError, Vote};

#[derive(Debug, Arbitrary)]
struct Row {
    age_minutes: u32,
    upvotes: i64,
    downvotes: i64,
    visits: i64,
    featured: bool,
    status: u8,
    voted: Option<bool>,
}

fuzz_target!(|rows: Vec<Row>| {
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let mut votes = HashMap::new();
    let listings: Vec<_> = rows
        .iter()
        .take(256)
        .enumerate()
        .map(|(i, row)| {
            let id = i as u64 + 1;
            if let Some(up) = row.voted {
                let vote = if up { Vote::Up } else { Vote::Down };
                votes.insert(("fuzz".to_string(), ListingId(id)), vote);
            }
            let status = match row.status % 5 {
                0 => ListingStatus::Public,
                1 => ListingStatus::Pending,
                2 => ListingStatus::Private,
                3 => ListingStatus::Rejected,
                _ => ListingStatus::Other,
            };
            make_listing(
                id,
                now - Duration::minutes(row.age_minutes as i64),
                row.upvotes,
                row.downvotes,
                row.visits,
                row.featured,
                status,
            )
        })
        .collect();

    let ranked = match rank_listings(&listings, &votes, Some("fuzz"), now) {
        Ok(ranked) => ranked,
        Err(PulseError::InvalidInput(_)) => return,
        Err(other) => panic!("unexpected error: {}", other),
    };

    for entry in &ranked {
        assert!(entry.score.is_finite(), "non-finite score {}", entry.score);
        assert_eq!(entry.listing.status, ListingStatus::Public);
        assert!(entry.user_vote.is_some());
    }
    for pair in ranked.windows(2) {
        assert!(compare_ranked(&pair[0], &pair[1]).is_le(), "ranking not sorted");
    }

    let mut reversed = listings.clone();
    reversed.reverse();
    let again = rank_listings(&reversed, &votes, Some("fuzz"), now).expect("same input ranks twice");
    assert_eq!(ranked, again, "order depends on input order");
});
