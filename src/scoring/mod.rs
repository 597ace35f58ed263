// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Scoring and ranking: how directory listings get their numbers and their order.
//!
//! `core` is the score function and nothing else: pure, no allocation, no I/O.
//! `ranking` applies it to a listing set, fixes the order, then layers on the
//! viewer's votes. Nothing is persisted; every read recomputes.

mod core;
pub mod ranking;

pub use core::*;
pub use ranking::{annotate_votes, compare_ranked, rank_listings};
