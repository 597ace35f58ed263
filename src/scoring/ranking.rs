// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Directory ranking: how public listings get ordered.
//!
//! Three steps, always in this order:
//!
//! 1. **Filter**: only `Public` listings go further. Others are never scored.
//! 2. **Score and sort**: engagement score, with a deterministic tie-break.
//! 3. **Annotate**: the viewer's own vote is attached after the order is fixed,
//!    so it cannot leak into the score.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::core::{engagement_score, validate_listing};
use crate::error::Result;
use crate::types::{Listing, ListingId, ListingStatus, RankedListing, Vote};
use crate::verify::contracts::{check_ranking_sorted, check_scores_finite};

/// Compare two ranked listings.
///
/// Sort order:
/// 1. **Score** - descending
/// 2. **createdAt** - ascending, so the older listing holds its place on a tie
/// 3. **Listing ID** - final tiebreaker when everything else is equal
pub fn compare_ranked(a: &RankedListing, b: &RankedListing) -> Ordering {
    match b.score.total_cmp(&a.score) {
        Ordering::Equal => match a.listing.created_at.cmp(&b.listing.created_at) {
            Ordering::Equal => a.listing.id.cmp(&b.listing.id),
            other => other,
        },
        other => other,
    }
}

/// Rank public listings at time `now`.
///
/// `votes` is keyed by `(viewer, listing)`. When `viewer` is `Some`, every result
/// carries that viewer's vote (`Vote::None` if they never voted). When `viewer` is
/// `None`, results carry no annotation.
///
/// Fails with `InvalidInput` if any public listing cannot be scored. Non-public
/// listings are dropped before validation, so a broken private row never fails
/// the call.
pub fn rank_listings(
    listings: &[Listing],
    votes: &HashMap<(String, ListingId), Vote>,
    viewer: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Vec<RankedListing>> {
    let mut ranked = listings
        .iter()
        .filter(|l| l.status == ListingStatus::Public)
        .map(|listing| {
            let metrics = validate_listing(listing)?;
            Ok(RankedListing {
                listing: listing.clone(),
                score: engagement_score(&metrics, now),
                user_vote: None,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    // INVARIANT: RANKING_TOTAL_ORDER
    ranked.sort_by(compare_ranked);

    check_scores_finite(&ranked);
    check_ranking_sorted(&ranked);

    // INVARIANT: VOTE_IS_ANNOTATION (applied after the order is fixed)
    if let Some(viewer) = viewer {
        annotate_votes(&mut ranked, votes, viewer);
    }
    Ok(ranked)
}

/// Attach one viewer's votes to an already ordered ranking.
pub fn annotate_votes(
    ranked: &mut [RankedListing],
    votes: &HashMap<(String, ListingId), Vote>,
    viewer: &str,
) {
    let viewer = viewer.to_string();
    for entry in ranked.iter_mut() {
        let key = (viewer.clone(), entry.listing.id);
        entry.user_vote = Some(votes.get(&key).copied().unwrap_or_default());
    }
}
