// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Search index materialization and engagement ranking for a crawled-site directory.
//!
//! Two independent halves share this crate.
//!
//! The **index builder** folds a crawl store (site analyses plus their meta tags)
//! into one denormalized record per site, publishes it as an immutable generation,
//! and swaps generations atomically so readers never see a half-built index.
//!
//! The **ranking engine** scores public directory listings by votes, visits, a
//! featured bonus and age decay, and orders them deterministically.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   snapshot   ┌────────────┐   verify   ┌──────────────────┐
//! │    store     │─────────────▶│   build    │───────────▶│      index       │
//! │ (CrawlSource)│              │ (par fold) │            │ (SiteIndex, swap)│
//! └──────────────┘              └────────────┘            └──────────────────┘
//!        ▲                                                   │          │
//!        │ on write / periodic                               ▼          ▼
//! ┌──────────────┐                                    index::persist   query
//! │   refresh    │                                    (.pulse files)   (get/search)
//! └──────────────┘
//!
//! ┌──────────────┐   snapshot   ┌──────────────────────────────────────────┐
//! │   listing    │─────────────▶│ scoring (core: score, ranking: order+vote)│
//! └──────────────┘              └──────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use pulse::{CrawlAnalysis, CrawlTag, MemoryCrawlStore, SiteIndex};
//!
//! let store = MemoryCrawlStore::new();
//! let id = store.save_analysis(&CrawlAnalysis {
//!     url: "https://example.com".to_string(),
//!     title: Some("Example".to_string()),
//!     meta_tags: vec![CrawlTag::new("description", "An example site")],
//!     ..Default::default()
//! });
//!
//! let index = SiteIndex::new();
//! index.rebuild(&store).unwrap();
//!
//! let record = index.get(id).unwrap();
//! assert_eq!(record.meta_content.as_deref(), Some("description: An example site"));
//! assert_eq!(index.search("example site", 10).len(), 1);
//! ```

pub mod build;
pub mod config;
pub mod error;
pub mod index;
pub mod listing;
pub mod refresh;
pub mod scoring;
pub mod store;
pub mod testing;
mod types;
pub mod utils;
pub mod verify;

pub use config::PulseConfig;
pub use error::{PulseError, Result};
pub use index::{IndexGeneration, RebuildOptions, RebuildReport, SiteIndex, TextQuery};
pub use listing::{JsonListingSource, ListingSnapshot, ListingSource, MemoryListingStore};
pub use refresh::{RefreshPolicy, Refresher, RetryPolicy, WriteThroughIndex};
pub use scoring::{engagement_score, rank_listings};
pub use store::{CrawlAnalysis, CrawlSnapshot, CrawlSource, CrawlTag, JsonlCrawlSource, MemoryCrawlStore};
pub use types::*;
