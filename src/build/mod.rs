// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Folding a crawl snapshot into derived index records.
//!
//! This is a pure function of the snapshot. Group the tags by `analysis_id`, turn
//! each group into one space-separated string of `"<name>: <content>"` fragments,
//! then attach that string to the site's scalar fields. No I/O, no shared state,
//! so running it twice on the same snapshot gives the same records.
//!
//! Tags whose analysis is not in the snapshot are counted and dropped. They cannot
//! produce a record, and a record without its site would break the one-record-per-site
//! invariant the index promises.

pub mod parallel;

use std::collections::{BTreeMap, HashMap};

use crate::types::{AnalysisId, IndexRecord, MetaTag, SiteAnalysis};

pub use parallel::*;

/// Separator between fragments in `meta_content`.
pub const FRAGMENT_SEPARATOR: &str = " ";

/// What a build produced, keyed by analysis id.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub records: BTreeMap<AnalysisId, IndexRecord>,
    pub stats: BuildStats,
}

/// Counters reported after every build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub sites: usize,
    pub tags: usize,
    /// Tags that pointed at an analysis missing from the snapshot.
    pub orphan_tags: usize,
    /// Sites with no tags at all (their `meta_content` is `None`).
    pub tagless_sites: usize,
}

/// Group tag fragments by the analysis they belong to.
///
/// Within a group, fragments keep snapshot order. Callers must not rely on that.
pub fn group_fragments(tags: &[MetaTag]) -> HashMap<AnalysisId, Vec<String>> {
    let mut groups: HashMap<AnalysisId, Vec<String>> = HashMap::new();
    for tag in tags {
        groups.entry(tag.analysis_id).or_default().push(tag.fragment());
    }
    groups
}

/// Join fragments with a single space. No fragments means no meta content.
pub fn join_fragments(fragments: &[String]) -> Option<String> {
    // INVARIANT: META_CONTENT_NEVER_EMPTY
    if fragments.is_empty() {
        None
    } else {
        Some(fragments.join(FRAGMENT_SEPARATOR))
    }
}

/// Project one site and its fragments into an index record.
pub fn derive_record(site: &SiteAnalysis, fragments: Option<&[String]>) -> IndexRecord {
    IndexRecord {
        id: site.id,
        url: site.url.clone(),
        language: site.language.clone(),
        title: site.title.clone(),
        canonical_url: site.canonical_url.clone(),
        content_text: site.content_text.clone(),
        meta_content: fragments.and_then(join_fragments),
    }
}
