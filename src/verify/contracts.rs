// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Debug-mode assertions on ranking output and generation swaps.
//!
//! Every function here compiles to nothing in release builds.

use std::cmp::Ordering;

use crate::scoring::compare_ranked;
use crate::types::RankedListing;

/// Check that ranked listings are in final order.
///
/// # Panics (debug builds only)
/// Panics if any adjacent pair is out of order.
#[inline]
pub fn check_ranking_sorted(ranked: &[RankedListing]) {
    for i in 1..ranked.len() {
        debug_assert!(
            compare_ranked(&ranked[i - 1], &ranked[i]) != Ordering::Greater,
            "Contract violation: ranking out of order at {} (listing {} score {} before listing {} score {})",
            i,
            ranked[i - 1].listing.id,
            ranked[i - 1].score,
            ranked[i].listing.id,
            ranked[i].score
        );
    }
}

/// Check that every score is a finite number.
///
/// Net votes can be negative, so a score can be too. Only NaN and infinity are bugs.
///
/// # Panics (debug builds only)
#[inline]
pub fn check_scores_finite(ranked: &[RankedListing]) {
    for entry in ranked {
        debug_assert!(
            entry.score.is_finite(),
            "Contract violation: listing {} has non-finite score {}",
            entry.listing.id,
            entry.score
        );
    }
}

/// Check that a swap only ever moves the generation number forward.
///
/// # Panics (debug builds only)
#[inline]
pub fn check_generation_advances(current: u64, next: u64) {
    debug_assert!(
        next > current,
        "Contract violation: generation {} would replace newer generation {}",
        next,
        current
    );
}
