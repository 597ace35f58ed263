// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The crawl store boundary.
//!
//! The crawler owns this data; the index builder only reads it, and only through
//! `CrawlSource::snapshot`. A snapshot is a point-in-time copy: whatever the
//! crawler does after the call returns cannot leak into the rebuild that is
//! consuming it. That is the whole consistency story for the search path.
//!
//! Two sources ship with the crate. `MemoryCrawlStore` is the in-process store
//! used by hosts that embed the crawler and by tests. `JsonlCrawlSource` reads a
//! crawl output directory, either flat record files or the crawler's batch files.

mod jsonl;
mod memory;

pub use jsonl::JsonlCrawlSource;
pub use memory::MemoryCrawlStore;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{MetaTag, SiteAnalysis};
use crate::utils::{sanitize_opt, sanitize_text};

/// A consistent copy of the crawl store at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSnapshot {
    pub sites: Vec<SiteAnalysis>,
    pub tags: Vec<MetaTag>,
    /// Store-defined change counter at the time of the snapshot. Monotonic per store.
    pub version: u64,
}

impl CrawlSnapshot {
    pub fn new(sites: Vec<SiteAnalysis>, tags: Vec<MetaTag>) -> Self {
        Self {
            sites,
            tags,
            version: 0,
        }
    }
}

/// Read access to a crawl store.
///
/// Implementations must return a snapshot that is internally consistent: every
/// site and tag in it existed together at some instant at or after the call began.
pub trait CrawlSource: Send + Sync {
    /// Take a snapshot of every site analysis and meta tag.
    ///
    /// Fails with `PulseError::SourceUnavailable` when the store cannot be read.
    fn snapshot(&self) -> Result<CrawlSnapshot>;

    /// Short label for logs.
    fn describe(&self) -> String {
        "crawl store".to_string()
    }
}

impl<T: CrawlSource + ?Sized> CrawlSource for std::sync::Arc<T> {
    fn snapshot(&self) -> Result<CrawlSnapshot> {
        (**self).snapshot()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// A fixed snapshot is its own source.
impl CrawlSource for CrawlSnapshot {
    fn snapshot(&self) -> Result<CrawlSnapshot> {
        Ok(self.clone())
    }

    fn describe(&self) -> String {
        format!("fixed snapshot ({} sites)", self.sites.len())
    }
}

/// One analysis as the crawler emits it: the page fields with its tags nested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlAnalysis {
    pub url: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub meta_tags: Vec<CrawlTag>,
    #[serde(default)]
    pub canonical_url: Option<String>,
    #[serde(default)]
    pub content_text: Option<String>,
}

/// A tag nested inside a `CrawlAnalysis`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlTag {
    pub name: String,
    pub content: String,
}

impl CrawlTag {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Split a nested crawler analysis into store records under the given id.
///
/// Every text field is sanitized on the way in.
pub fn split_analysis(
    id: crate::types::AnalysisId,
    analysis: &CrawlAnalysis,
) -> (SiteAnalysis, Vec<MetaTag>) {
    let site = sanitize_site(&SiteAnalysis {
        id,
        url: analysis.url.clone(),
        language: analysis.language.clone(),
        title: analysis.title.clone(),
        canonical_url: analysis.canonical_url.clone(),
        content_text: analysis.content_text.clone(),
    });
    let tags = analysis
        .meta_tags
        .iter()
        .map(|tag| MetaTag {
            analysis_id: id,
            name: sanitize_text(&tag.name),
            content: sanitize_text(&tag.content),
        })
        .collect();
    (site, tags)
}

pub(crate) fn sanitize_site(site: &SiteAnalysis) -> SiteAnalysis {
    SiteAnalysis {
        id: site.id,
        url: sanitize_text(&site.url),
        language: sanitize_opt(site.language.as_deref()),
        title: sanitize_opt(site.title.as_deref()),
        canonical_url: sanitize_opt(site.canonical_url.as_deref()),
        content_text: sanitize_opt(site.content_text.as_deref()),
    }
}

pub(crate) fn sanitize_tag(tag: &MetaTag) -> MetaTag {
    MetaTag {
        analysis_id: tag.analysis_id,
        name: sanitize_text(&tag.name),
        content: sanitize_text(&tag.content),
    }
}
