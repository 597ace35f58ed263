// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Wrappers that only exist if the invariant held when they were built.
//!
//! `VerifiedRecords` is the gate between a finished build and a promoted
//! generation. The index will not swap in a record set unless it went through
//! `VerifiedRecords::check` against the snapshot it was built from.
//!
//! | Type              | What's Guaranteed                                         |
//! |-------------------|-----------------------------------------------------------|
//! | `VerifiedRecords` | one record per snapshot site, none extra, fields copied, `meta_content` well-formed |

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::build::FRAGMENT_SEPARATOR;
use crate::store::CrawlSnapshot;
use crate::types::{AnalysisId, IndexRecord};

/// Error type for invariant violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantError {
    /// A site in the snapshot has no record.
    MissingRecord { id: AnalysisId },
    /// A record exists for an id the snapshot does not contain.
    UnexpectedRecord { id: AnalysisId },
    /// A scalar field differs from the site it was derived from.
    FieldMismatch { id: AnalysisId, field: &'static str },
    /// `meta_content` is `Some("")`; tagless records must carry `None`.
    EmptyMetaContent { id: AnalysisId },
    /// `meta_content` length disagrees with the fragments that should build it.
    FragmentMismatch { id: AnalysisId },
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantError::MissingRecord { id } => {
                write!(f, "analysis {} has no index record", id)
            }
            InvariantError::UnexpectedRecord { id } => {
                write!(f, "index record {} has no analysis in the snapshot", id)
            }
            InvariantError::FieldMismatch { id, field } => {
                write!(f, "index record {} field '{}' differs from its analysis", id, field)
            }
            InvariantError::EmptyMetaContent { id } => {
                write!(f, "index record {} has empty meta_content", id)
            }
            InvariantError::FragmentMismatch { id } => {
                write!(f, "index record {} meta_content does not match its tags", id)
            }
        }
    }
}

impl std::error::Error for InvariantError {}

/// A record set proven to match one crawl snapshot.
#[derive(Debug, Clone)]
pub struct VerifiedRecords {
    records: BTreeMap<AnalysisId, IndexRecord>,
}

impl VerifiedRecords {
    /// Check `records` against `snapshot` and wrap them if they match.
    pub fn check(
        snapshot: &CrawlSnapshot,
        records: BTreeMap<AnalysisId, IndexRecord>,
    ) -> Result<Self, InvariantError> {
        let mut fragment_lens: HashMap<AnalysisId, (usize, usize)> = HashMap::new();
        for tag in &snapshot.tags {
            let entry = fragment_lens.entry(tag.analysis_id).or_default();
            entry.0 += 1;
            entry.1 += tag.fragment().len();
        }

        let mut expected = 0usize;
        for site in &snapshot.sites {
            expected += 1;
            let record = records
                .get(&site.id)
                .ok_or(InvariantError::MissingRecord { id: site.id })?;

            let fields: [(&'static str, bool); 5] = [
                ("url", record.url == site.url),
                ("language", record.language == site.language),
                ("title", record.title == site.title),
                ("canonical_url", record.canonical_url == site.canonical_url),
                ("content_text", record.content_text == site.content_text),
            ];
            if let Some((field, _)) = fields.iter().find(|(_, same)| !same) {
                return Err(InvariantError::FieldMismatch {
                    id: site.id,
                    field: *field,
                });
            }

            check_meta_content(record)?;

            let want = fragment_lens
                .get(&site.id)
                .map(|(count, bytes)| bytes + (count - 1) * FRAGMENT_SEPARATOR.len());
            let have = record.meta_content.as_ref().map(String::len);
            if want != have {
                return Err(InvariantError::FragmentMismatch { id: site.id });
            }
        }

        if records.len() != expected {
            let sites: std::collections::HashSet<AnalysisId> =
                snapshot.sites.iter().map(|s| s.id).collect();
            if let Some(id) = records.keys().find(|id| !sites.contains(id)) {
                return Err(InvariantError::UnexpectedRecord { id: *id });
            }
        }

        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<AnalysisId, IndexRecord> {
        self.records
    }
}

/// A record's `meta_content` is either absent or non-empty.
pub fn check_meta_content(record: &IndexRecord) -> Result<(), InvariantError> {
    match record.meta_content.as_deref() {
        None => Ok(()),
        Some("") => Err(InvariantError::EmptyMetaContent { id: record.id }),
        Some(_) => Ok(()),
    }
}
