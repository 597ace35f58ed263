// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The records that flow through the engine.
//!
//! Two families live here. The crawl side (`SiteAnalysis`, `MetaTag`) is what the
//! crawler writes and the engine only reads. The derived side (`IndexRecord`) is
//! what the index builder produces and owns outright. Listings and votes feed the
//! directory ranking and never touch the search path.
//!
//! # Invariants (the stuff that breaks if you ignore it)
//!
//! - **IndexRecord**: exactly one per `SiteAnalysis::id` after a completed rebuild,
//!   and none for an id that is not in the crawl snapshot.
//!
//! - **IndexRecord::meta_content**: `None` when the analysis has no tags. Never an
//!   empty string, never a dangling separator.
//!
//! - **Listing**: counts are non-negative and `created_at` is present before a
//!   listing is scored. `ListingMetrics` is the validated form.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// NEWTYPES
// =============================================================================

/// Identifier of one crawl analysis run for a site.
///
/// The crawler assigns it; the index keys on it. Ordering follows the numeric value,
/// which is also the order index scans return records in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct AnalysisId(pub i64);

impl AnalysisId {
    /// Get the underlying value.
    #[inline]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for AnalysisId {
    fn from(id: i64) -> Self {
        AnalysisId(id)
    }
}

impl fmt::Display for AnalysisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a public directory listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct ListingId(pub u64);

impl From<u64> for ListingId {
    fn from(id: u64) -> Self {
        ListingId(id)
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// CRAWL STORE RECORDS
// =============================================================================

/// One crawled page analysis, as written by the crawler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteAnalysis {
    pub id: AnalysisId,
    pub url: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub canonical_url: Option<String>,
    #[serde(default)]
    pub content_text: Option<String>,
}

/// A `<meta>` tag extracted from the analysed page.
///
/// An analysis may carry several tags with the same name (`og:` variants are the
/// usual culprit), or none at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTag {
    pub analysis_id: AnalysisId,
    pub name: String,
    pub content: String,
}

impl MetaTag {
    /// The `"<name>: <content>"` fragment this tag contributes to `meta_content`.
    pub fn fragment(&self) -> String {
        format!("{}: {}", self.name, self.content)
    }
}

// =============================================================================
// DERIVED INDEX RECORDS
// =============================================================================

/// Denormalized, search-ready projection of one `SiteAnalysis` plus its tags.
///
/// Owned by the index builder. Nothing else constructs these outside of tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: AnalysisId,
    pub url: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub canonical_url: Option<String>,
    #[serde(default)]
    pub content_text: Option<String>,
    /// Tag fragments joined by a single space. Fragment order is not a contract.
    #[serde(default)]
    pub meta_content: Option<String>,
}

impl IndexRecord {
    /// The three full-text fields, in scan order. Missing fields come back empty.
    pub fn text_fields(&self) -> [&str; 3] {
        [
            self.title.as_deref().unwrap_or(""),
            self.content_text.as_deref().unwrap_or(""),
            self.meta_content.as_deref().unwrap_or(""),
        ]
    }
}

// =============================================================================
// DIRECTORY LISTINGS
// =============================================================================

/// Publication state of a directory listing. Only `Public` listings are ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Public,
    Pending,
    Private,
    Rejected,
    /// A status this build does not know, such as `draft`. Never ranked.
    #[serde(other)]
    Other,
}

/// A viewer's own vote on a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Up,
    Down,
    #[default]
    None,
}

/// Public-directory projection of a site, as read from the listing store.
///
/// Counts are signed here so malformed rows survive deserialization and get
/// rejected with a useful error instead of a serde failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: ListingId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub upvotes: i64,
    #[serde(default)]
    pub downvotes: i64,
    #[serde(default)]
    pub monthly_visits: i64,
    #[serde(default)]
    pub is_featured: bool,
    pub status: ListingStatus,
}

/// Validated scoring inputs for one listing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListingMetrics {
    pub created_at: DateTime<Utc>,
    pub upvotes: u64,
    pub downvotes: u64,
    pub monthly_visits: u64,
    pub is_featured: bool,
}

impl ListingMetrics {
    /// `upvotes - downvotes`, possibly negative.
    #[inline]
    pub fn net_votes(&self) -> i64 {
        self.upvotes as i64 - self.downvotes as i64
    }
}

/// A listing in its final ranked position, with the viewer's vote layered on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedListing {
    pub listing: Listing,
    pub score: f64,
    /// Present only when the ranking was requested on behalf of a viewer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_vote: Option<Vote>,
}
