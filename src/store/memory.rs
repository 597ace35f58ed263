// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! In-process crawl store.
//!
//! All state sits behind one `RwLock`, so a snapshot is a single read-locked
//! clone and can never observe half of a write. Every mutation bumps `version`,
//! which gives refresh policies a cheap "did anything change" check.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use tracing::debug;

use super::{sanitize_site, sanitize_tag, split_analysis, CrawlAnalysis, CrawlSnapshot, CrawlSource};
use crate::error::Result;
use crate::types::{AnalysisId, MetaTag, SiteAnalysis};

#[derive(Debug, Default)]
struct StoreState {
    sites: BTreeMap<AnalysisId, SiteAnalysis>,
    tags: Vec<MetaTag>,
    next_id: i64,
    version: u64,
}

impl StoreState {
    fn touch(&mut self) {
        self.version += 1;
    }
}

/// Crawl store held in memory. Cheap to share behind an `Arc`.
#[derive(Debug, Default)]
pub struct MemoryCrawlStore {
    state: RwLock<StoreState>,
}

impl MemoryCrawlStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save a crawler analysis: insert the site, then its tags. Returns the new id.
    pub fn save_analysis(&self, analysis: &CrawlAnalysis) -> AnalysisId {
        let mut state = self.state.write();
        state.next_id += 1;
        let id = AnalysisId(state.next_id);
        let (site, tags) = split_analysis(id, analysis);
        state.sites.insert(id, site);
        state.tags.extend(tags);
        state.touch();
        id
    }

    /// Insert or replace a site analysis by id. Existing tags are kept.
    pub fn upsert_site(&self, site: SiteAnalysis) {
        let mut state = self.state.write();
        state.next_id = state.next_id.max(site.id.get());
        state.sites.insert(site.id, sanitize_site(&site));
        state.touch();
    }

    /// Append tags. The owning analysis does not have to exist yet.
    pub fn insert_tags(&self, tags: impl IntoIterator<Item = MetaTag>) {
        let mut state = self.state.write();
        let before = state.tags.len();
        state.tags.extend(tags.into_iter().map(|t| sanitize_tag(&t)));
        if state.tags.len() != before {
            state.touch();
        }
    }

    /// Replace every tag of one analysis.
    pub fn replace_tags(&self, id: AnalysisId, tags: impl IntoIterator<Item = MetaTag>) {
        let mut state = self.state.write();
        state.tags.retain(|t| t.analysis_id != id);
        state.tags.extend(
            tags.into_iter()
                .map(|t| MetaTag {
                    analysis_id: id,
                    ..sanitize_tag(&t)
                }),
        );
        state.touch();
    }

    /// Delete an analysis and cascade to its tags. Returns whether it existed.
    pub fn delete_analysis(&self, id: AnalysisId) -> bool {
        let mut state = self.state.write();
        let existed = state.sites.remove(&id).is_some();
        let before = state.tags.len();
        state.tags.retain(|t| t.analysis_id != id);
        let cascaded = before - state.tags.len();
        if existed || cascaded > 0 {
            debug!(%id, cascaded, "deleted analysis");
            state.touch();
        }
        existed
    }

    pub fn len(&self) -> usize {
        self.state.read().sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().sites.is_empty()
    }

    /// Current change counter.
    pub fn version(&self) -> u64 {
        self.state.read().version
    }
}

impl CrawlSource for MemoryCrawlStore {
    fn snapshot(&self) -> Result<CrawlSnapshot> {
        let state = self.state.read();
        Ok(CrawlSnapshot {
            sites: state.sites.values().cloned().collect(),
            tags: state.tags.clone(),
            version: state.version,
        })
    }

    fn describe(&self) -> String {
        "memory crawl store".to_string()
    }
}
