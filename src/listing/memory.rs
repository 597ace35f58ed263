// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! In-process listing store.
//!
//! Votes and counters live under one lock, so casting a vote moves the listing's
//! counters and the viewer's vote record in the same step.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::{ListingSnapshot, ListingSource};
use crate::error::{PulseError, Result};
use crate::types::{Listing, ListingId, ListingStatus, Vote};

#[derive(Debug, Default)]
struct ListingState {
    listings: BTreeMap<ListingId, Listing>,
    votes: HashMap<(String, ListingId), Vote>,
}

/// Listing store held in memory.
#[derive(Debug)]
pub struct MemoryListingStore {
    state: RwLock<ListingState>,
    clock: fn() -> DateTime<Utc>,
}

impl Default for MemoryListingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryListingStore {
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    /// A store whose snapshots read the time from `clock`.
    pub fn with_clock(clock: fn() -> DateTime<Utc>) -> Self {
        Self {
            state: RwLock::new(ListingState::default()),
            clock,
        }
    }

    /// Insert or replace a listing.
    ///
    /// A replacement brings its own counters, so the votes recorded against the
    /// old counters are dropped. A viewer who votes again starts from no vote.
    pub fn upsert(&self, listing: Listing) {
        let mut state = self.state.write();
        let id = listing.id;
        if state.listings.insert(id, listing).is_some() {
            state.votes.retain(|(_, voted), _| *voted != id);
        }
    }

    pub fn set_status(&self, id: ListingId, status: ListingStatus) -> Result<()> {
        let mut state = self.state.write();
        let listing = state
            .listings
            .get_mut(&id)
            .ok_or_else(|| PulseError::InvalidInput(format!("unknown listing {}", id)))?;
        listing.status = status;
        Ok(())
    }

    /// Record a viewer's vote, replacing any earlier one, and move the counters.
    pub fn cast_vote(&self, viewer: &str, id: ListingId, vote: Vote) -> Result<()> {
        let mut state = self.state.write();
        let previous = state
            .votes
            .get(&(viewer.to_string(), id))
            .copied()
            .unwrap_or_default();
        let listing = state
            .listings
            .get_mut(&id)
            .ok_or_else(|| PulseError::InvalidInput(format!("unknown listing {}", id)))?;

        // Counters never go below zero, whatever the vote records say.
        match previous {
            Vote::Up => listing.upvotes = (listing.upvotes - 1).max(0),
            Vote::Down => listing.downvotes = (listing.downvotes - 1).max(0),
            Vote::None => {}
        }
        match vote {
            Vote::Up => listing.upvotes += 1,
            Vote::Down => listing.downvotes += 1,
            Vote::None => {}
        }

        if vote == Vote::None {
            state.votes.remove(&(viewer.to_string(), id));
        } else {
            state.votes.insert((viewer.to_string(), id), vote);
        }
        Ok(())
    }

    pub fn record_visit(&self, id: ListingId) -> Result<()> {
        let mut state = self.state.write();
        let listing = state
            .listings
            .get_mut(&id)
            .ok_or_else(|| PulseError::InvalidInput(format!("unknown listing {}", id)))?;
        listing.monthly_visits += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.state.read().listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().listings.is_empty()
    }
}

impl ListingSource for MemoryListingStore {
    fn snapshot(&self) -> Result<ListingSnapshot> {
        let state = self.state.read();
        Ok(ListingSnapshot {
            listings: state.listings.values().cloned().collect(),
            votes: state.votes.clone(),
            as_of: (self.clock)(),
        })
    }
}
