// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! One immutable, fully built version of the index.
//!
//! Readers hold an `Arc<IndexGeneration>` for as long as they like. A rebuild never
//! touches a generation that has been published; it builds a new one and swaps the
//! pointer. So a reader sees every record of one generation and nothing of another,
//! no matter how long its scan takes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{PulseError, Result};
use crate::types::{AnalysisId, IndexRecord};
use crate::utils::normalize;

/// A complete set of derived index records, as of one rebuild.
#[derive(Debug, Clone, Default)]
pub struct IndexGeneration {
    generation: u64,
    built_at: Option<DateTime<Utc>>,
    source_version: u64,
    records: BTreeMap<AnalysisId, IndexRecord>,
    // Normalized text fields per record, filled once when the generation is made.
    search_text: BTreeMap<AnalysisId, Vec<String>>,
}

impl IndexGeneration {
    /// The empty generation a fresh index starts from. Generation number 0.
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(
        generation: u64,
        built_at: DateTime<Utc>,
        source_version: u64,
        records: BTreeMap<AnalysisId, IndexRecord>,
    ) -> Self {
        Self::restore(generation, Some(built_at), source_version, records)
    }

    /// Rebuild a generation from persisted parts.
    pub(crate) fn restore(
        generation: u64,
        built_at: Option<DateTime<Utc>>,
        source_version: u64,
        records: BTreeMap<AnalysisId, IndexRecord>,
    ) -> Self {
        let search_text = searchable_fields(&records);
        Self {
            generation,
            built_at,
            source_version,
            records,
            search_text,
        }
    }

    /// Monotonic generation number. 0 means nothing has been built or loaded.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// When this generation was built. `None` for the empty generation.
    pub fn built_at(&self) -> Option<DateTime<Utc>> {
        self.built_at
    }

    /// The crawl store version the generation was built from.
    pub fn source_version(&self) -> u64 {
        self.source_version
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: AnalysisId) -> bool {
        self.records.contains_key(&id)
    }

    /// Look up the record for one analysis.
    pub fn get(&self, id: AnalysisId) -> Result<&IndexRecord> {
        self.records.get(&id).ok_or(PulseError::NotFound(id))
    }

    /// All records, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &IndexRecord> {
        self.records.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = AnalysisId> + '_ {
        self.records.keys().copied()
    }

    /// Every record the predicate accepts, ordered by id.
    pub fn scan<F>(&self, predicate: F) -> Vec<&IndexRecord>
    where
        F: Fn(&IndexRecord) -> bool,
    {
        self.records.values().filter(|r| predicate(r)).collect()
    }

    /// Records matching a text query over title, content and meta content.
    ///
    /// Ordered by id and capped at `limit`. There is no relevance ranking here;
    /// that belongs to whatever query layer sits on top.
    pub fn search(&self, query: &TextQuery, limit: usize) -> Vec<&IndexRecord> {
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }
        self.records
            .values()
            .filter(|r| {
                self.search_text
                    .get(&r.id)
                    .is_some_and(|fields| query.matches_normalized(fields))
            })
            .take(limit)
            .collect()
    }
}

fn normalized_fields(record: &IndexRecord) -> Vec<String> {
    record
        .text_fields()
        .iter()
        .filter(|f| !f.is_empty())
        .map(|f| normalize(f))
        .collect()
}

#[cfg(feature = "parallel")]
fn searchable_fields(
    records: &BTreeMap<AnalysisId, IndexRecord>,
) -> BTreeMap<AnalysisId, Vec<String>> {
    records
        .par_iter()
        .map(|(id, record)| (*id, normalized_fields(record)))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn searchable_fields(
    records: &BTreeMap<AnalysisId, IndexRecord>,
) -> BTreeMap<AnalysisId, Vec<String>> {
    records
        .iter()
        .map(|(id, record)| (*id, normalized_fields(record)))
        .collect()
}

/// A normalized conjunctive text predicate.
///
/// Each whitespace-separated term must occur (as a substring, after normalization)
/// in at least one of the record's three text fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextQuery {
    terms: Vec<String>,
}

impl TextQuery {
    pub fn parse(query: &str) -> Self {
        let terms = normalize(query)
            .split_whitespace()
            .map(str::to_string)
            .collect();
        Self { terms }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Normalizes the record's fields first. Generations keep them pre-normalized,
    /// so prefer `IndexGeneration::search` over calling this per record.
    pub fn matches(&self, record: &IndexRecord) -> bool {
        self.matches_normalized(&normalized_fields(record))
    }

    /// Match against fields that already went through `normalize`.
    pub fn matches_normalized(&self, fields: &[String]) -> bool {
        !self.terms.is_empty()
            && self
                .terms
                .iter()
                .all(|term| fields.iter().any(|field| field.contains(term.as_str())))
    }
}
