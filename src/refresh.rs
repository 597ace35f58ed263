// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! When the index gets rebuilt.
//!
//! Two policies, with different staleness:
//!
//! | Policy     | Who rebuilds                          | Staleness bound                          |
//! |------------|---------------------------------------|------------------------------------------|
//! | `OnWrite`  | the writer, before its call returns   | 0 for the writer; other readers see the write once the rebuild is promoted |
//! | `Periodic` | a background thread every `interval`  | `interval` + one rebuild + retry backoff |
//!
//! Either way a failed rebuild never touches the served generation. Retriable
//! failures (`SourceUnavailable`, `RebuildAborted`) are retried with exponential
//! backoff; anything else fails the round immediately.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::error::{PulseError, Result};
use crate::index::{RebuildReport, SiteIndex};
use crate::store::{CrawlAnalysis, CrawlSource, MemoryCrawlStore};
use crate::types::{AnalysisId, MetaTag, SiteAnalysis};

/// Default period between background rebuilds.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);

// ============================================================================
// POLICY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Rebuild synchronously inside every write.
    OnWrite,
    /// Rebuild in the background on a fixed period, or when triggered.
    Periodic { interval: Duration },
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        RefreshPolicy::Periodic {
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl RefreshPolicy {
    /// Worst-case age of what a reader sees, given how long one rebuild takes.
    pub fn staleness_bound(&self, rebuild_time: Duration, retry: &RetryPolicy) -> Duration {
        match self {
            RefreshPolicy::OnWrite => Duration::ZERO,
            RefreshPolicy::Periodic { interval } => {
                *interval + rebuild_time * (retry.max_retries + 1) + retry.total_backoff()
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RefreshPolicy::OnWrite => "on_write",
            RefreshPolicy::Periodic { .. } => "periodic",
        }
    }
}

/// Exponential backoff for retriable rebuild failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(150),
            max_backoff: Duration::from_millis(1200),
        }
    }
}

impl RetryPolicy {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-based): doubles, then caps.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Sum of every backoff delay in one exhausted round.
    pub fn total_backoff(&self) -> Duration {
        (0..self.max_retries).map(|a| self.backoff(a)).sum()
    }
}

/// Rebuild, retrying retriable failures with backoff.
pub fn rebuild_with_retry(
    index: &SiteIndex,
    source: &dyn CrawlSource,
    retry: &RetryPolicy,
) -> Result<RebuildReport> {
    let mut attempt = 0;
    loop {
        match index.rebuild(source) {
            Ok(report) => return Ok(report),
            Err(e) if e.is_retriable() && attempt < retry.max_retries => {
                let delay = retry.backoff(attempt);
                warn!(
                    attempt = attempt + 1,
                    max_retries = retry.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "rebuild failed, retrying"
                );
                thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

// ============================================================================
// PERIODIC
// ============================================================================

#[derive(Debug, Default)]
struct Signal {
    triggered: bool,
    shutdown: bool,
}

#[derive(Debug, Default)]
struct Shared {
    signal: Mutex<Signal>,
    wake: Condvar,
    rounds: AtomicU64,
    failures: AtomicU64,
}

/// Background thread that rebuilds an index on a period.
///
/// Dropping the handle stops the thread after its current round.
#[derive(Debug)]
pub struct Refresher {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl Refresher {
    /// Start refreshing. The first rebuild runs immediately.
    pub fn spawn(
        index: Arc<SiteIndex>,
        source: Arc<dyn CrawlSource>,
        interval: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let shared = Arc::new(Shared::default());
        shared.signal.lock().triggered = true;

        let worker = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("pulse-refresh".to_string())
            .spawn(move || run(&worker, &index, source.as_ref(), interval, &retry))?;

        info!(interval_secs = interval.as_secs(), "periodic refresh started");
        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    /// Ask for a rebuild now instead of at the next tick.
    pub fn trigger(&self) {
        self.shared.signal.lock().triggered = true;
        self.shared.wake.notify_one();
    }

    /// Completed rounds, successful or not.
    pub fn rounds(&self) -> u64 {
        self.shared.rounds.load(Ordering::Acquire)
    }

    /// Rounds that ended in an error after retries.
    pub fn failures(&self) -> u64 {
        self.shared.failures.load(Ordering::Acquire)
    }

    /// Stop the thread and wait for it.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        self.shared.signal.lock().shutdown = true;
        self.shared.wake.notify_one();
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| PulseError::RebuildAborted("refresh thread panicked".to_string()))?;
        }
        Ok(())
    }
}

impl Drop for Refresher {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!(error = %e, "refresh thread did not stop cleanly");
        }
    }
}

fn run(
    shared: &Shared,
    index: &SiteIndex,
    source: &dyn CrawlSource,
    interval: Duration,
    retry: &RetryPolicy,
) {
    loop {
        {
            let mut signal = shared.signal.lock();
            if !signal.triggered && !signal.shutdown {
                shared.wake.wait_for(&mut signal, interval);
            }
            if signal.shutdown {
                break;
            }
            signal.triggered = false;
        }

        match rebuild_with_retry(index, source, retry) {
            Ok(report) => debug!(generation = report.generation, "refresh round done"),
            Err(e) => {
                shared.failures.fetch_add(1, Ordering::AcqRel);
                warn!(
                    error = %e,
                    generation = index.generation(),
                    "refresh round failed, serving previous generation"
                );
            }
        }
        shared.rounds.fetch_add(1, Ordering::AcqRel);
    }
    debug!("periodic refresh stopped");
}

// ============================================================================
// ON WRITE
// ============================================================================

/// A crawl store whose writes rebuild the index before returning.
///
/// If the write lands but the rebuild fails, the error is returned and the index
/// keeps serving the previous generation. The next successful write (or an
/// explicit `refresh`) catches it up.
#[derive(Debug, Clone)]
pub struct WriteThroughIndex {
    store: Arc<MemoryCrawlStore>,
    index: Arc<SiteIndex>,
    retry: RetryPolicy,
}

impl WriteThroughIndex {
    pub fn new(store: Arc<MemoryCrawlStore>, index: Arc<SiteIndex>, retry: RetryPolicy) -> Self {
        Self {
            store,
            index,
            retry,
        }
    }

    pub fn store(&self) -> &Arc<MemoryCrawlStore> {
        &self.store
    }

    pub fn index(&self) -> &Arc<SiteIndex> {
        &self.index
    }

    pub fn save_analysis(&self, analysis: &CrawlAnalysis) -> Result<AnalysisId> {
        let id = self.store.save_analysis(analysis);
        self.refresh()?;
        Ok(id)
    }

    pub fn upsert_site(&self, site: SiteAnalysis) -> Result<()> {
        self.store.upsert_site(site);
        self.refresh().map(|_| ())
    }

    pub fn insert_tags(&self, tags: Vec<MetaTag>) -> Result<()> {
        self.store.insert_tags(tags);
        self.refresh().map(|_| ())
    }

    pub fn replace_tags(&self, id: AnalysisId, tags: Vec<MetaTag>) -> Result<()> {
        self.store.replace_tags(id, tags);
        self.refresh().map(|_| ())
    }

    pub fn delete_analysis(&self, id: AnalysisId) -> Result<bool> {
        let existed = self.store.delete_analysis(id);
        self.refresh()?;
        Ok(existed)
    }

    /// Rebuild from the store now.
    pub fn refresh(&self) -> Result<RebuildReport> {
        rebuild_with_retry(&self.index, self.store.as_ref(), &self.retry)
    }
}
