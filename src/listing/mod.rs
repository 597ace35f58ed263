// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The listing store boundary.
//!
//! Vote and visit counters change under concurrent writers. A ranking must read
//! all of them at one instant, otherwise two listings can be scored against
//! different moments and swap places for no reason. `ListingSource::snapshot`
//! is that instant: listings, viewer votes and the clock reading all come back
//! together, and scoring never goes back to the store.

mod file;
mod memory;

pub use file::JsonListingSource;
pub use memory::MemoryListingStore;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::scoring::rank_listings;
use crate::types::{Listing, ListingId, RankedListing, Vote};

/// Every listing and every viewer vote, read together.
#[derive(Debug, Clone, Default)]
pub struct ListingSnapshot {
    pub listings: Vec<Listing>,
    /// Keyed by `(viewer, listing)`.
    pub votes: HashMap<(String, ListingId), Vote>,
    /// When the snapshot was taken. Ranking uses this as "now".
    pub as_of: DateTime<Utc>,
}

impl ListingSnapshot {
    /// Rank this snapshot, optionally on behalf of a viewer.
    pub fn rank(&self, viewer: Option<&str>) -> Result<Vec<RankedListing>> {
        rank_listings(&self.listings, &self.votes, viewer, self.as_of)
    }
}

/// Read access to a listing store.
pub trait ListingSource: Send + Sync {
    /// Fails with `PulseError::SourceUnavailable` when the store cannot be read.
    fn snapshot(&self) -> Result<ListingSnapshot>;
}

/// One stored vote, as it appears in listing files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRecord {
    pub viewer: String,
    pub listing_id: ListingId,
    pub vote: Vote,
}

/// Take one snapshot and rank it.
pub fn rank(source: &dyn ListingSource, viewer: Option<&str>) -> Result<Vec<RankedListing>> {
    source.snapshot()?.rank(viewer)
}
