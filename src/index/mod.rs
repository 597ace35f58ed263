// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The live index: a pointer to the current generation plus the machinery to replace it.
//!
//! ```text
//!   CrawlSource ──snapshot──▶ build_records ──▶ VerifiedRecords ──▶ IndexGeneration
//!                                                                      │
//!   readers ◀── Arc clone ◀── RwLock<Arc<IndexGeneration>> ◀── swap ───┘
//! ```
//!
//! Readers take the read lock only long enough to clone the `Arc`. Everything after
//! that runs against an immutable generation with no lock held, so a slow scan never
//! blocks a swap and a swap never changes what a scan sees.
//!
//! Rebuilds are serialized by a separate mutex. A second caller waits for the first
//! to finish, then takes its own fresh snapshot. Two rebuilds can never race to
//! promote, and the generation number only ever moves forward.

mod generation;
pub mod persist;

pub use generation::{IndexGeneration, TextQuery};
pub use persist::SnapshotDir;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use indicatif::ProgressBar;

use crate::build::{build_records, BuildOutput, BuildStats};
use crate::error::{PulseError, Result};
use crate::store::{CrawlSnapshot, CrawlSource};
use crate::types::{AnalysisId, IndexRecord};
use crate::verify::contracts::check_generation_advances;
use crate::verify::VerifiedRecords;

/// Knobs for a single rebuild.
#[derive(Debug, Clone)]
pub struct RebuildOptions {
    /// A rebuild that takes longer than this is aborted before promotion.
    pub timeout: Option<Duration>,
}

impl Default for RebuildOptions {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(600)),
        }
    }
}

/// What a completed rebuild promoted.
#[derive(Debug, Clone)]
pub struct RebuildReport {
    pub generation: u64,
    pub records: usize,
    pub source_version: u64,
    pub stats: BuildStats,
    pub elapsed: Duration,
    /// Where the generation was persisted, if the index has a snapshot directory
    /// and the write succeeded.
    pub persisted: Option<PathBuf>,
}

/// The index the query layer reads from.
#[derive(Debug)]
pub struct SiteIndex {
    current: RwLock<Arc<IndexGeneration>>,
    rebuild_lock: Mutex<()>,
    options: RebuildOptions,
    snapshots: Option<SnapshotDir>,
}

impl Default for SiteIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteIndex {
    /// An empty in-memory index (generation 0).
    pub fn new() -> Self {
        Self::with_options(RebuildOptions::default())
    }

    pub fn with_options(options: RebuildOptions) -> Self {
        Self {
            current: RwLock::new(Arc::new(IndexGeneration::empty())),
            rebuild_lock: Mutex::new(()),
            options,
            snapshots: None,
        }
    }

    /// An index backed by a snapshot directory.
    ///
    /// Starts from the newest valid snapshot in `dir` if there is one, otherwise
    /// empty. Every promoted generation is written back to `dir`, keeping the
    /// newest `keep` files.
    pub fn open(dir: impl AsRef<Path>, keep: usize, options: RebuildOptions) -> Result<Self> {
        let snapshots = SnapshotDir::new(dir.as_ref(), keep);
        let initial = match snapshots.load_latest()? {
            Some((_, generation)) => generation,
            None => {
                debug!(dir = %dir.as_ref().display(), "no snapshot found, starting empty");
                IndexGeneration::empty()
            }
        };
        Ok(Self {
            current: RwLock::new(Arc::new(initial)),
            rebuild_lock: Mutex::new(()),
            options,
            snapshots: Some(snapshots),
        })
    }

    /// The current generation. Hold it as long as needed; it never changes.
    pub fn reader(&self) -> Arc<IndexGeneration> {
        Arc::clone(&self.current.read())
    }

    /// Current generation number.
    pub fn generation(&self) -> u64 {
        self.current.read().generation()
    }

    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.read().is_empty()
    }

    /// Look up one record in the current generation.
    pub fn get(&self, id: AnalysisId) -> Result<IndexRecord> {
        self.reader().get(id).cloned()
    }

    /// Run a text query against the current generation.
    pub fn search(&self, query: &str, limit: usize) -> Vec<IndexRecord> {
        let reader = self.reader();
        let query = TextQuery::parse(query);
        reader.search(&query, limit).into_iter().cloned().collect()
    }

    pub fn snapshot_dir(&self) -> Option<&SnapshotDir> {
        self.snapshots.as_ref()
    }

    /// Rebuild every record from a fresh snapshot of `source` and swap it in.
    ///
    /// On any error the current generation stays in place and remains readable.
    pub fn rebuild(&self, source: &dyn CrawlSource) -> Result<RebuildReport> {
        self.rebuild_with(source, build_records)
    }

    /// Like [`rebuild`](Self::rebuild), advancing `progress` once per site.
    #[cfg(feature = "parallel")]
    pub fn rebuild_with_progress(
        &self,
        source: &dyn CrawlSource,
        progress: &ProgressBar,
    ) -> Result<RebuildReport> {
        self.rebuild_with(source, |snapshot| {
            crate::build::build_records_with_progress(snapshot, progress)
        })
    }

    fn rebuild_with<F>(&self, source: &dyn CrawlSource, build: F) -> Result<RebuildReport>
    where
        F: FnOnce(&CrawlSnapshot) -> BuildOutput,
    {
        // INVARIANT: SINGLE_REBUILDER
        let _guard = self.rebuild_lock.lock();
        let started = Instant::now();
        info!(source = %source.describe(), "rebuild started");

        let snapshot = source.snapshot().map_err(|e| {
            warn!(error = %e, "rebuild could not read crawl source");
            e
        })?;
        self.check_deadline(started)?;

        let output = build(&snapshot);
        self.check_deadline(started)?;

        let verified = VerifiedRecords::check(&snapshot, output.records).map_err(|e| {
            warn!(error = %e, "rebuild output failed verification");
            PulseError::RebuildAborted(e.to_string())
        })?;

        let previous = self.generation();
        let next_number = previous + 1;
        check_generation_advances(previous, next_number);
        let next = Arc::new(IndexGeneration::new(
            next_number,
            Utc::now(),
            snapshot.version,
            verified.into_inner(),
        ));

        let persisted = self.persist(&next);

        // INVARIANT: GENERATION_SWAP_ATOMIC
        // Readers hold their own Arc; replacing the pointer never touches them.
        *self.current.write() = Arc::clone(&next);

        let elapsed = started.elapsed();
        info!(
            generation = next_number,
            records = next.len(),
            orphan_tags = output.stats.orphan_tags,
            elapsed_ms = elapsed.as_millis() as u64,
            "rebuild promoted"
        );

        Ok(RebuildReport {
            generation: next_number,
            records: next.len(),
            source_version: snapshot.version,
            stats: output.stats,
            elapsed,
            persisted,
        })
    }

    fn check_deadline(&self, started: Instant) -> Result<()> {
        match self.options.timeout {
            Some(limit) if started.elapsed() > limit => {
                warn!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    limit_ms = limit.as_millis() as u64,
                    "rebuild exceeded its time limit"
                );
                Err(PulseError::RebuildAborted(format!(
                    "rebuild exceeded {:?}",
                    limit
                )))
            }
            _ => Ok(()),
        }
    }

    /// Persisted snapshots are a cache: a failed write is logged, not fatal.
    fn persist(&self, generation: &IndexGeneration) -> Option<PathBuf> {
        let dir = self.snapshots.as_ref()?;
        match dir.write(generation) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(
                    dir = %dir.dir().display(),
                    generation = generation.generation(),
                    error = %e,
                    "failed to persist index snapshot"
                );
                None
            }
        }
    }
}
