// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Listings exported to a JSON file.
//!
//! ```json
//! { "listings": [ { "id": 1, "createdAt": "...", "status": "public", ... } ],
//!   "votes":    [ { "viewer": "ana", "listingId": 1, "vote": "up" } ] }
//! ```
//!
//! The file is read whole on each snapshot, which is as consistent as the export.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Deserialize;

use super::{ListingSnapshot, ListingSource, VoteRecord};
use crate::error::{PulseError, Result};
use crate::types::Listing;

#[derive(Deserialize)]
struct ListingFile {
    #[serde(default)]
    listings: Vec<Listing>,
    #[serde(default)]
    votes: Vec<VoteRecord>,
}

#[derive(Debug, Clone)]
pub struct JsonListingSource {
    path: PathBuf,
}

impl JsonListingSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ListingSource for JsonListingSource {
    fn snapshot(&self) -> Result<ListingSnapshot> {
        let bytes = fs::read(&self.path).map_err(|e| {
            PulseError::SourceUnavailable(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        let file: ListingFile = serde_json::from_slice(&bytes).map_err(|e| {
            PulseError::InvalidInput(format!("{}: {}", self.path.display(), e))
        })?;
        Ok(ListingSnapshot {
            listings: file.listings,
            votes: file
                .votes
                .into_iter()
                .map(|v| ((v.viewer, v.listing_id), v.vote))
                .collect(),
            as_of: Utc::now(),
        })
    }
}
