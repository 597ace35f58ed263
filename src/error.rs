// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Error kinds surfaced by the engine.
//!
//! The first four are the ones callers make decisions on: `SourceUnavailable` and
//! `RebuildAborted` are worth retrying, `NotFound` and `InvalidInput` are not.
//! The rest wrap I/O and codec failures from snapshot files and crawl directories.

use thiserror::Error;

use crate::types::AnalysisId;

#[derive(Error, Debug)]
pub enum PulseError {
    /// The crawl or listing store could not be read.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// A rebuild stopped before its output could be promoted.
    #[error("rebuild aborted: {0}")]
    RebuildAborted(String),

    /// No derived index record exists for this id.
    #[error("no index record for analysis {0}")]
    NotFound(AnalysisId),

    /// Input rejected before it reached scoring or the index.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A persisted snapshot failed its integrity checks.
    #[error("corrupt snapshot {path}: {reason}")]
    CorruptSnapshot { path: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PulseError {
    /// True for failures a scheduler should retry with backoff.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            PulseError::SourceUnavailable(_) | PulseError::RebuildAborted(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PulseError>;
