// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! CLI definitions for the pulse command-line interface.
//!
//! `rebuild` folds a crawl directory into a new index generation and persists it.
//! `lookup` and `search` read the newest persisted generation. `rank` orders a
//! listing export. `inspect` dumps a snapshot file. `watch` keeps rebuilding on
//! the configured period.

pub mod display;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "pulse",
    about = "Site index builder and directory ranking engine",
    version
)]
pub struct Cli {
    /// JSON config file
    #[arg(long, global = true, env = "PULSE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Crawl output directory (overrides config)
    #[arg(long, global = true, env = "PULSE_CRAWL_DIR")]
    pub crawl_dir: Option<PathBuf>,

    /// Index snapshot directory (overrides config)
    #[arg(long, global = true, env = "PULSE_INDEX_DIR")]
    pub index_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rebuild the index from the crawl directory and write a new snapshot
    Rebuild {
        /// Do not draw a progress bar
        #[arg(long)]
        quiet: bool,
    },

    /// Print the index record for one analysis id as JSON
    Lookup {
        id: i64,
    },

    /// Find records whose title, content or meta tags contain every query term
    Search {
        query: String,

        /// Maximum results (defaults to search.default_limit)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Emit JSON lines instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Rank the public listings in a listing export
    Rank {
        /// JSON file with `listings` and `votes`
        file: PathBuf,

        /// Annotate results with this viewer's votes
        #[arg(long)]
        viewer: Option<String>,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Inspect a .pulse snapshot file
    Inspect {
        file: PathBuf,
    },

    /// Rebuild on the configured period until stopped
    Watch {
        /// Stop after this many rounds (0 runs forever)
        #[arg(long, default_value = "0")]
        rounds: u64,
    },
}
