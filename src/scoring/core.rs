// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The math behind directory ranking.
//!
//! ```text
//! score = (net_votes * 1.5 + monthly_visits * 1.0) * featured_bonus * (age_days + 2)^-0.5
//! ```
//!
//! Engagement is linear, the featured bonus is multiplicative, and age decays the
//! whole thing slowly. Because the bonus multiplies, a featured listing with a
//! negative base score is pushed further down, not up. That is intended.
//!
//! # Constants
//!
//! | Constant            | Value | Role                                           |
//! |---------------------|-------|------------------------------------------------|
//! | `VOTES_WEIGHT`      | 1.5   | A net vote is worth more than a visit          |
//! | `VISITS_WEIGHT`     | 1.0   | Baseline                                       |
//! | `FEATURED_BONUS`    | 2.0   | Multiplier for featured listings               |
//! | `DECAY_OFFSET_DAYS` | 2.0   | Keeps decay finite (and ≤ 1/√2) at age 0       |
//! | `DECAY_EXPONENT`    | -0.5  | Inverse square root: slow, never reaches zero  |

use chrono::{DateTime, Utc};

use crate::error::{PulseError, Result};
use crate::types::{Listing, ListingMetrics};

// =============================================================================
// SCORING CONSTANTS
// =============================================================================

/// Weight of one net vote.
pub const VOTES_WEIGHT: f64 = 1.5;

/// Weight of one monthly visit.
pub const VISITS_WEIGHT: f64 = 1.0;

/// Multiplier applied to featured listings.
pub const FEATURED_BONUS: f64 = 2.0;

/// Added to the age before decay. Must stay positive so age 0 is finite.
pub const DECAY_OFFSET_DAYS: f64 = 2.0;

/// Exponent of the age decay.
pub const DECAY_EXPONENT: f64 = -0.5;

const SECONDS_PER_DAY: f64 = 86_400.0;

// Evaluated at build time.
const _: () = {
    assert!(FEATURED_BONUS > 1.0);
    assert!(DECAY_OFFSET_DAYS > 0.0);
    assert!(DECAY_EXPONENT < 0.0);
    assert!(VOTES_WEIGHT > 0.0 && VISITS_WEIGHT > 0.0);
};

// =============================================================================
// SCORE COMPONENTS
// =============================================================================

/// Fractional days between `created_at` and `now`. Clock skew never makes it negative.
#[inline]
pub fn age_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let seconds = (now - created_at).num_milliseconds() as f64 / 1000.0;
    (seconds / SECONDS_PER_DAY).max(0.0)
}

/// `(age_days + 2)^-0.5`. In `(0, 1/√2]` for any non-negative age.
#[inline]
pub fn decay(age_days: f64) -> f64 {
    (age_days.max(0.0) + DECAY_OFFSET_DAYS).powf(DECAY_EXPONENT)
}

#[inline]
pub fn featured_bonus(is_featured: bool) -> f64 {
    if is_featured {
        FEATURED_BONUS
    } else {
        1.0
    }
}

/// Undecayed engagement: weighted net votes plus weighted visits.
#[inline]
pub fn base_score(metrics: &ListingMetrics) -> f64 {
    metrics.net_votes() as f64 * VOTES_WEIGHT + metrics.monthly_visits as f64 * VISITS_WEIGHT
}

/// The full engagement score of one listing at time `now`.
pub fn engagement_score(metrics: &ListingMetrics, now: DateTime<Utc>) -> f64 {
    base_score(metrics)
        * featured_bonus(metrics.is_featured)
        * decay(age_days(metrics.created_at, now))
}

/// Turn a raw listing into scoring inputs, or say why it cannot be scored.
///
/// Rejects a missing `createdAt` and negative counts. Scoring such a row would
/// produce NaN or a silently wrong rank.
pub fn validate_listing(listing: &Listing) -> Result<ListingMetrics> {
    let created_at = listing.created_at.ok_or_else(|| {
        PulseError::InvalidInput(format!("listing {}: missing createdAt", listing.id))
    })?;
    let count = |name: &str, value: i64| -> Result<u64> {
        u64::try_from(value).map_err(|_| {
            PulseError::InvalidInput(format!(
                "listing {}: negative {} ({})",
                listing.id, name, value
            ))
        })
    };
    Ok(ListingMetrics {
        created_at,
        upvotes: count("upvotes", listing.upvotes)?,
        downvotes: count("downvotes", listing.downvotes)?,
        monthly_visits: count("monthlyVisits", listing.monthly_visits)?,
        is_featured: listing.is_featured,
    })
}
