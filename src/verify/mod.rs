// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The verification layer: checked wrappers and runtime contracts.
//!
//! 1. **Checked wrappers** (`VerifiedRecords`) run in every build profile. A rebuild
//!    whose output fails the check is aborted instead of promoted, so readers never
//!    see a record set that disagrees with the crawl snapshot it came from.
//!
//! 2. **Runtime contracts** panic in debug builds when an invariant is violated.
//!    Zero-cost in release, but they catch ordering and scoring bugs when tests run.

pub mod contracts;
mod types;

pub use types::*;
