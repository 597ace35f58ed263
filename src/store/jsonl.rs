// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Crawl output directory as a crawl source.
//!
//! Layout:
//!
//! ```text
//! <crawl_dir>/
//!   sites.jsonl            one SiteAnalysis per line (optional)
//!   meta_tags.jsonl        one MetaTag per line (optional)
//!   analyses/**/*.jsonl    crawler batches, one nested CrawlAnalysis per line (optional)
//! ```
//!
//! Flat records keep their ids. Batch analyses carry no id, so they get one after
//! the highest flat id, walking files in path order and lines in file order. An
//! unchanged directory therefore always produces the same ids.
//!
//! The directory is read fresh on every snapshot; nothing is cached between calls.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use super::{sanitize_site, sanitize_tag, split_analysis, CrawlAnalysis, CrawlSnapshot, CrawlSource};
use crate::error::{PulseError, Result};
use crate::types::{AnalysisId, MetaTag, SiteAnalysis};

pub const SITES_FILE: &str = "sites.jsonl";
pub const META_TAGS_FILE: &str = "meta_tags.jsonl";
pub const ANALYSES_DIR: &str = "analyses";

/// Reads a crawl directory on every `snapshot()` call.
#[derive(Debug, Clone)]
pub struct JsonlCrawlSource {
    dir: PathBuf,
}

impl JsonlCrawlSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl CrawlSource for JsonlCrawlSource {
    fn snapshot(&self) -> Result<CrawlSnapshot> {
        if !self.dir.is_dir() {
            return Err(PulseError::SourceUnavailable(format!(
                "crawl directory {} is not readable",
                self.dir.display()
            )));
        }

        let mut sites: Vec<SiteAnalysis> = read_records(&self.dir.join(SITES_FILE))?;
        let mut tags: Vec<MetaTag> = read_records(&self.dir.join(META_TAGS_FILE))?;
        for site in &mut sites {
            *site = sanitize_site(site);
        }
        for tag in &mut tags {
            *tag = sanitize_tag(tag);
        }

        // Re-crawls append a newer line for the same id; the last one wins.
        sites.reverse();
        let mut seen = std::collections::HashSet::new();
        sites.retain(|s| seen.insert(s.id));
        sites.sort_by_key(|s| s.id);

        let batch_files = batch_files(&self.dir.join(ANALYSES_DIR))?;
        let mut next_id = sites.last().map(|s| s.id.get()).unwrap_or(0);
        for path in &batch_files {
            let analyses: Vec<CrawlAnalysis> = read_records(path)?;
            for analysis in &analyses {
                next_id += 1;
                let (site, site_tags) = split_analysis(AnalysisId(next_id), analysis);
                sites.push(site);
                tags.extend(site_tags);
            }
        }

        debug!(
            dir = %self.dir.display(),
            sites = sites.len(),
            tags = tags.len(),
            batch_files = batch_files.len(),
            "read crawl directory"
        );

        Ok(CrawlSnapshot {
            sites,
            tags,
            version: directory_version(&self.dir),
        })
    }

    fn describe(&self) -> String {
        format!("crawl directory {}", self.dir.display())
    }
}

/// Parse one JSON record per non-blank line. A missing file is an empty file.
fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(PulseError::SourceUnavailable(format!(
                "failed to open {}: {}",
                path.display(),
                e
            )))
        }
    };

    let mut records = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| {
            PulseError::SourceUnavailable(format!("failed to read {}: {}", path.display(), e))
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| {
            PulseError::InvalidInput(format!("{}:{}: {}", path.display(), line_no + 1, e))
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Every `*.jsonl` below `root`, sorted by path. Missing root means no batches.
fn batch_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if root.is_dir() {
        collect_jsonl(root, &mut files)?;
    }
    files.sort();
    Ok(files)
}

fn collect_jsonl(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| {
        PulseError::SourceUnavailable(format!("failed to list {}: {}", dir.display(), e))
    })?;
    for entry in entries {
        let path = entry
            .map_err(|e| PulseError::SourceUnavailable(e.to_string()))?
            .path();
        if path.is_dir() {
            collect_jsonl(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "jsonl") {
            out.push(path);
        }
    }
    Ok(())
}

/// Latest modification time under the flat files, in seconds. Good enough as a change hint.
fn directory_version(dir: &Path) -> u64 {
    [SITES_FILE, META_TAGS_FILE, ANALYSES_DIR]
        .iter()
        .filter_map(|name| fs::metadata(dir.join(name)).ok())
        .filter_map(|meta| meta.modified().ok())
        .filter_map(|time| time.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .max()
        .unwrap_or(0)
}
