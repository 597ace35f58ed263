// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Parallel record derivation.
//!
//! Grouping tags is one sequential pass over a flat list and is cheap. Deriving the
//! records is the part that scales with content size (every `content_text` gets
//! cloned), and it is embarrassingly parallel: each site only reads its own group.
//! Rayon handles that with `par_iter()`. Without the `parallel` feature the same
//! code runs on one thread.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(feature = "parallel")]
use indicatif::ProgressBar;

use std::collections::BTreeMap;

use super::{derive_record, group_fragments, BuildOutput, BuildStats};
use crate::store::CrawlSnapshot;
use crate::types::{AnalysisId, IndexRecord};

/// Derive every index record from a snapshot.
pub fn build_records(snapshot: &CrawlSnapshot) -> BuildOutput {
    let groups = group_fragments(&snapshot.tags);

    #[cfg(feature = "parallel")]
    let derived: Vec<IndexRecord> = snapshot
        .sites
        .par_iter()
        .map(|site| derive_record(site, groups.get(&site.id).map(Vec::as_slice)))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let derived: Vec<IndexRecord> = snapshot
        .sites
        .iter()
        .map(|site| derive_record(site, groups.get(&site.id).map(Vec::as_slice)))
        .collect();

    finish(snapshot, &groups, derived)
}

/// Derive every index record, advancing a progress bar once per site.
#[cfg(feature = "parallel")]
pub fn build_records_with_progress(snapshot: &CrawlSnapshot, progress: &ProgressBar) -> BuildOutput {
    let groups = group_fragments(&snapshot.tags);
    progress.set_length(snapshot.sites.len() as u64);

    let derived: Vec<IndexRecord> = snapshot
        .sites
        .par_iter()
        .map(|site| {
            let record = derive_record(site, groups.get(&site.id).map(Vec::as_slice));
            progress.inc(1);
            record
        })
        .collect();

    finish(snapshot, &groups, derived)
}

fn finish(
    snapshot: &CrawlSnapshot,
    groups: &std::collections::HashMap<AnalysisId, Vec<String>>,
    derived: Vec<IndexRecord>,
) -> BuildOutput {
    let tagless_sites = derived.iter().filter(|r| r.meta_content.is_none()).count();

    let mut records = BTreeMap::new();
    for record in derived {
        records.insert(record.id, record);
    }

    let orphan_tags = groups
        .iter()
        .filter(|(id, _)| !records.contains_key(*id))
        .map(|(_, fragments)| fragments.len())
        .sum::<usize>();
    if orphan_tags > 0 {
        tracing::debug!(orphan_tags, "dropped tags without a matching analysis");
    }

    BuildOutput {
        stats: BuildStats {
            sites: records.len(),
            tags: snapshot.tags.len(),
            orphan_tags,
            tagless_sites,
        },
        records,
    }
}
