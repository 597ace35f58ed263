//! Ranking properties.
//!
//! - the score grows with net votes and with visits, all else equal
//! - featured doubles the score, so it lifts positive scores and sinks negative ones
//! - non-public listings never appear
//! - the order is sorted, total and independent of input order
//! - the viewer annotation never moves anything

use std::collections::HashMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use crate::common::make_listing;
use pulse::scoring::{compare_ranked, validate_listing};
use pulse::{engagement_score, rank_listings, Listing, ListingId, ListingStatus, Vote};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
}

fn score(listing: &Listing) -> f64 {
    engagement_score(&validate_listing(listing).unwrap(), now())
}

fn arb_status() -> impl Strategy<Value = ListingStatus> {
    prop_oneof![
        4 => Just(ListingStatus::Public),
        1 => Just(ListingStatus::Pending),
        1 => Just(ListingStatus::Private),
        1 => Just(ListingStatus::Rejected),
        1 => Just(ListingStatus::Other),
    ]
}

fn arb_vote() -> impl Strategy<Value = Vote> {
    prop_oneof![Just(Vote::Up), Just(Vote::Down), Just(Vote::None)]
}

/// Listings with unique ids. Small ranges so ties actually happen.
fn arb_listings() -> impl Strategy<Value = Vec<Listing>> {
    prop::collection::vec(
        (0i64..30, 0i64..20, 0i64..20, 0i64..50, any::<bool>(), arb_status()),
        0..25,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (age, up, down, visits, featured, status))| {
                make_listing(
                    i as u64 + 1,
                    now() - Duration::days(age),
                    up,
                    down,
                    visits,
                    featured,
                    status,
                )
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: one more net vote never lowers the score.
    #[test]
    fn prop_monotonic_in_votes(age in 0i64..365, up in 0i64..1000, down in 0i64..1000, visits in 0i64..10_000) {
        let t0 = now() - Duration::days(age);
        let base = make_listing(1, t0, up, down, visits, false, ListingStatus::Public);
        let more = make_listing(1, t0, up + 1, down, visits, false, ListingStatus::Public);
        prop_assert!(score(&more) > score(&base));
    }

    /// Property: one more visit never lowers the score.
    #[test]
    fn prop_monotonic_in_visits(age in 0i64..365, up in 0i64..1000, down in 0i64..1000, visits in 0i64..10_000) {
        let t0 = now() - Duration::days(age);
        let base = make_listing(1, t0, up, down, visits, false, ListingStatus::Public);
        let more = make_listing(1, t0, up, down, visits + 1, false, ListingStatus::Public);
        prop_assert!(score(&more) > score(&base));
    }

    /// Property: featured is exactly a factor of two.
    #[test]
    fn prop_featured_doubles(age in 0i64..365, up in 0i64..1000, down in 0i64..1000, visits in 0i64..10_000) {
        let t0 = now() - Duration::days(age);
        let plain = score(&make_listing(1, t0, up, down, visits, false, ListingStatus::Public));
        let featured = score(&make_listing(1, t0, up, down, visits, true, ListingStatus::Public));
        prop_assert!((featured - 2.0 * plain).abs() <= 1e-9 * plain.abs().max(1.0));
        if plain > 0.0 {
            prop_assert!(featured > plain);
        } else if plain < 0.0 {
            prop_assert!(featured < plain);
        }
    }

    /// Property: scores are finite for any valid listing, however old or popular.
    #[test]
    fn prop_score_finite(age in 0i64..100_000, up in 0i64..i32::MAX as i64, down in 0i64..i32::MAX as i64, visits in 0i64..i32::MAX as i64, featured in any::<bool>()) {
        let listing = make_listing(1, now() - Duration::days(age), up, down, visits, featured, ListingStatus::Public);
        prop_assert!(score(&listing).is_finite());
    }

    /// Property: only public listings are ranked, and all of them are.
    #[test]
    fn prop_only_public(listings in arb_listings()) {
        let ranked = rank_listings(&listings, &HashMap::new(), None, now()).unwrap();
        let public = listings.iter().filter(|l| l.status == ListingStatus::Public).count();
        prop_assert_eq!(ranked.len(), public);
        prop_assert!(ranked.iter().all(|r| r.listing.status == ListingStatus::Public));
    }

    /// Property: the output is sorted by the ranking comparator.
    #[test]
    fn prop_sorted(listings in arb_listings()) {
        let ranked = rank_listings(&listings, &HashMap::new(), None, now()).unwrap();
        for pair in ranked.windows(2) {
            prop_assert!(compare_ranked(&pair[0], &pair[1]).is_le());
            prop_assert!(pair[0].score >= pair[1].score);
        }
    }

    /// Property: input order does not affect output order.
    #[test]
    fn prop_order_independent_of_input(listings in arb_listings()) {
        let forward = rank_listings(&listings, &HashMap::new(), None, now()).unwrap();
        let mut reversed_input = listings.clone();
        reversed_input.reverse();
        let reversed = rank_listings(&reversed_input, &HashMap::new(), None, now()).unwrap();
        let ids = |r: &[pulse::RankedListing]| r.iter().map(|e| e.listing.id).collect::<Vec<_>>();
        prop_assert_eq!(ids(&forward), ids(&reversed));
    }

    /// Property: annotating for a viewer keeps order and scores, and covers every entry.
    #[test]
    fn prop_annotation_is_not_a_signal(
        listings in arb_listings(),
        votes in prop::collection::vec((0u64..30, arb_vote()), 0..20),
    ) {
        let votes: HashMap<(String, ListingId), Vote> = votes
            .into_iter()
            .map(|(id, vote)| (("viewer".to_string(), ListingId(id)), vote))
            .collect();
        let anonymous = rank_listings(&listings, &votes, None, now()).unwrap();
        let annotated = rank_listings(&listings, &votes, Some("viewer"), now()).unwrap();

        prop_assert_eq!(anonymous.len(), annotated.len());
        for (a, b) in anonymous.iter().zip(annotated.iter()) {
            prop_assert_eq!(a.listing.id, b.listing.id);
            prop_assert_eq!(a.score, b.score);
            prop_assert!(a.user_vote.is_none());
            let expected = votes
                .get(&("viewer".to_string(), b.listing.id))
                .copied()
                .unwrap_or(Vote::None);
            prop_assert_eq!(b.user_vote, Some(expected));
        }
    }
}
