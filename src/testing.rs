// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Test utilities shared across unit and integration tests.
//!
//! This module is always compiled but hidden from documentation.

#![doc(hidden)]

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};

use crate::error::{PulseError, Result};
use crate::store::{CrawlSnapshot, CrawlSource};
use crate::types::{AnalysisId, Listing, ListingId, ListingStatus, MetaTag, SiteAnalysis};

/// Create a site analysis with a title and some body text.
pub fn make_site(id: i64, title: &str) -> SiteAnalysis {
    SiteAnalysis {
        id: AnalysisId(id),
        url: format!("https://site{}.example", id),
        language: Some("en".to_string()),
        title: Some(title.to_string()),
        canonical_url: None,
        content_text: Some(format!("Content of {}", title)),
    }
}

pub fn make_tag(analysis_id: i64, name: &str, content: &str) -> MetaTag {
    MetaTag {
        analysis_id: AnalysisId(analysis_id),
        name: name.to_string(),
        content: content.to_string(),
    }
}

/// Create a listing with every scoring input spelled out.
pub fn make_listing(
    id: u64,
    created_at: DateTime<Utc>,
    upvotes: i64,
    downvotes: i64,
    monthly_visits: i64,
    is_featured: bool,
    status: ListingStatus,
) -> Listing {
    Listing {
        id: ListingId(id),
        name: format!("Listing {}", id),
        url: format!("https://listing{}.example", id),
        created_at: Some(created_at),
        upvotes,
        downvotes,
        monthly_visits,
        is_featured,
        status,
    }
}

/// A crawl source that is always down.
#[derive(Debug, Default)]
pub struct FailingSource;

impl CrawlSource for FailingSource {
    fn snapshot(&self) -> Result<CrawlSnapshot> {
        Err(PulseError::SourceUnavailable("crawl store offline".to_string()))
    }

    fn describe(&self) -> String {
        "failing source".to_string()
    }
}

/// A crawl source that fails its first `failures` calls, then serves a fixed snapshot.
#[derive(Debug)]
pub struct FlakySource {
    failures: usize,
    calls: AtomicUsize,
    snapshot: CrawlSnapshot,
}

impl FlakySource {
    pub fn new(failures: usize, sites: Vec<SiteAnalysis>, tags: Vec<MetaTag>) -> Self {
        Self {
            failures,
            calls: AtomicUsize::new(0),
            snapshot: CrawlSnapshot::new(sites, tags),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CrawlSource for FlakySource {
    fn snapshot(&self) -> Result<CrawlSnapshot> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            Err(PulseError::SourceUnavailable(format!("flaky call {}", call + 1)))
        } else {
            Ok(self.snapshot.clone())
        }
    }
}
