// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! On-disk snapshots of index generations.
//!
//! The persisted index is a cache. The crawl store stays the source of truth and
//! any snapshot can be thrown away and rebuilt. What a snapshot buys is a warm
//! search path on restart, before the first rebuild has finished.
//!
//! # File layout
//!
//! ```text
//! ┌────────────────────────── header (21 bytes) ──────────────────────────┐
//! │ magic "PLSX" │ version u8 │ generation u64 │ records u32 │ payload u32 │
//! ├───────────────────────────────────────────────────────────────────────┤
//! │ payload: brotli(JSON SnapshotPayload)                                 │
//! ├────────────────────────── footer (8 bytes) ───────────────────────────┤
//! │ crc32 over header + payload │ magic "XSLP"                            │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian. Files are written to a temp name and renamed
//! into place, so a crash mid-write leaves either the old set of files or the new
//! one. A file that fails any check is skipped on load, never half-used.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use crc32fast::Hasher as Crc32Hasher;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::IndexGeneration;
use crate::error::{PulseError, Result};
use crate::types::IndexRecord;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Magic bytes: "PLSX" in ASCII (header)
pub const MAGIC: [u8; 4] = [0x50, 0x4C, 0x53, 0x58];

/// Footer magic: "XSLP" (reversed, marks valid file end)
pub const FOOTER_MAGIC: [u8; 4] = [0x58, 0x53, 0x4C, 0x50];

/// Current snapshot format version
pub const VERSION: u8 = 1;

/// File extension for snapshot files
pub const EXTENSION: &str = "pulse";

/// Maximum accepted snapshot size: 4 GiB of payload is already far past sane
pub const MAX_PAYLOAD_SIZE: usize = u32::MAX as usize;

/// Maximum decompressed payload (1 GiB). Stops a tiny crafted file from expanding without bound.
pub const MAX_DECOMPRESSED_SIZE: u64 = 1024 * 1024 * 1024;

const BROTLI_QUALITY: u32 = 5;
const BROTLI_LGWIN: u32 = 22;

// ============================================================================
// HEADER / FOOTER
// ============================================================================

/// Fixed-size snapshot header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub version: u8,
    pub generation: u64,
    pub record_count: u32,
    pub payload_len: u32,
}

impl SnapshotHeader {
    pub const SIZE: usize = 4 + 1 + 8 + 4 + 4;

    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&MAGIC)?;
        w.write_all(&[self.version])?;
        w.write_all(&self.generation.to_le_bytes())?;
        w.write_all(&self.record_count.to_le_bytes())?;
        w.write_all(&self.payload_len.to_le_bytes())?;
        Ok(())
    }

    pub fn read(bytes: &[u8]) -> io::Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("header too short: {} bytes (need {})", bytes.len(), Self::SIZE),
            ));
        }
        if bytes[0..4] != MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid magic: expected PLSX, got {:?}", &bytes[0..4]),
            ));
        }
        let version = bytes[4];
        let generation = u64::from_le_bytes(bytes[5..13].try_into().map_err(invalid)?);
        let record_count = u32::from_le_bytes(bytes[13..17].try_into().map_err(invalid)?);
        let payload_len = u32::from_le_bytes(bytes[17..21].try_into().map_err(invalid)?);
        Ok(Self {
            version,
            generation,
            record_count,
            payload_len,
        })
    }
}

fn invalid<E: std::fmt::Display>(e: E) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e.to_string())
}

/// Snapshot footer: checksum plus end marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotFooter {
    pub crc32: u32,
}

impl SnapshotFooter {
    pub const SIZE: usize = 8;

    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.crc32.to_le_bytes())?;
        w.write_all(&FOOTER_MAGIC)?;
        Ok(())
    }

    pub fn read(bytes: &[u8]) -> io::Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "file too short for footer",
            ));
        }
        let start = bytes.len() - Self::SIZE;
        if bytes[start + 4..] != FOOTER_MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid footer magic: {:?}", &bytes[start + 4..]),
            ));
        }
        let crc32 = u32::from_le_bytes(bytes[start..start + 4].try_into().map_err(invalid)?);
        Ok(Self { crc32 })
    }

    pub fn compute_crc32(data: &[u8]) -> u32 {
        let mut hasher = Crc32Hasher::new();
        hasher.update(data);
        hasher.finalize()
    }
}

// ============================================================================
// ENCODE / DECODE
// ============================================================================

#[derive(Serialize, Deserialize)]
struct SnapshotPayload {
    generation: u64,
    built_at: Option<DateTime<Utc>>,
    source_version: u64,
    records: Vec<IndexRecord>,
}

/// Serialize a generation into snapshot bytes.
pub fn encode_generation(generation: &IndexGeneration) -> Result<Vec<u8>> {
    let payload = SnapshotPayload {
        generation: generation.generation(),
        built_at: generation.built_at(),
        source_version: generation.source_version(),
        records: generation.iter().cloned().collect(),
    };
    let json = serde_json::to_vec(&payload)?;

    let mut compressed = Vec::new();
    {
        let mut encoder =
            brotli::CompressorWriter::new(&mut compressed, 4096, BROTLI_QUALITY, BROTLI_LGWIN);
        encoder.write_all(&json)?;
    }
    if compressed.len() > MAX_PAYLOAD_SIZE {
        return Err(PulseError::InvalidInput(format!(
            "snapshot payload of {} bytes exceeds the format limit",
            compressed.len()
        )));
    }

    let header = SnapshotHeader {
        version: VERSION,
        generation: generation.generation(),
        record_count: generation.len() as u32,
        payload_len: compressed.len() as u32,
    };

    let mut bytes =
        Vec::with_capacity(SnapshotHeader::SIZE + compressed.len() + SnapshotFooter::SIZE);
    header.write(&mut bytes)?;
    bytes.extend_from_slice(&compressed);
    let footer = SnapshotFooter {
        crc32: SnapshotFooter::compute_crc32(&bytes),
    };
    footer.write(&mut bytes)?;
    Ok(bytes)
}

/// Parse snapshot bytes. `label` names the source in error messages.
pub fn decode_generation(bytes: &[u8], label: &str) -> Result<IndexGeneration> {
    let corrupt = |reason: String| PulseError::CorruptSnapshot {
        path: label.to_string(),
        reason,
    };

    let header = SnapshotHeader::read(bytes).map_err(|e| corrupt(e.to_string()))?;
    if header.version != VERSION {
        return Err(corrupt(format!(
            "unsupported version {} (expected {})",
            header.version, VERSION
        )));
    }

    let expected_len =
        SnapshotHeader::SIZE + header.payload_len as usize + SnapshotFooter::SIZE;
    if bytes.len() != expected_len {
        return Err(corrupt(format!(
            "size mismatch: {} bytes, header says {}",
            bytes.len(),
            expected_len
        )));
    }

    let footer = SnapshotFooter::read(bytes).map_err(|e| corrupt(e.to_string()))?;
    let content = &bytes[..bytes.len() - SnapshotFooter::SIZE];
    let actual = SnapshotFooter::compute_crc32(content);
    if actual != footer.crc32 {
        return Err(corrupt(format!(
            "checksum mismatch: stored {:08x}, computed {:08x}",
            footer.crc32, actual
        )));
    }

    let mut json = Vec::new();
    brotli::Decompressor::new(&content[SnapshotHeader::SIZE..], 4096)
        .take(MAX_DECOMPRESSED_SIZE + 1)
        .read_to_end(&mut json)
        .map_err(|e| corrupt(format!("payload decompression failed: {}", e)))?;
    if json.len() as u64 > MAX_DECOMPRESSED_SIZE {
        return Err(corrupt("decompressed payload exceeds the size limit".to_string()));
    }
    let payload: SnapshotPayload =
        serde_json::from_slice(&json).map_err(|e| corrupt(format!("payload JSON: {}", e)))?;

    if payload.generation != header.generation {
        return Err(corrupt(format!(
            "generation mismatch: header {}, payload {}",
            header.generation, payload.generation
        )));
    }
    if payload.records.len() != header.record_count as usize {
        return Err(corrupt(format!(
            "record count mismatch: header {}, payload {}",
            header.record_count,
            payload.records.len()
        )));
    }

    let mut records = std::collections::BTreeMap::new();
    for record in payload.records {
        if records.insert(record.id, record).is_some() {
            return Err(corrupt("duplicate record id".to_string()));
        }
    }

    Ok(IndexGeneration::restore(
        payload.generation,
        payload.built_at,
        payload.source_version,
        records,
    ))
}

/// Read and validate one snapshot file.
pub fn read_snapshot(path: &Path) -> Result<IndexGeneration> {
    let bytes = fs::read(path)?;
    decode_generation(&bytes, &path.display().to_string())
}

// ============================================================================
// SNAPSHOT DIRECTORY
// ============================================================================

/// A directory of `index-<generation>.pulse` files.
#[derive(Debug, Clone)]
pub struct SnapshotDir {
    dir: PathBuf,
    keep: usize,
}

impl SnapshotDir {
    /// `keep` is how many snapshots survive pruning. At least one is always kept.
    pub fn new(dir: impl Into<PathBuf>, keep: usize) -> Self {
        Self {
            dir: dir.into(),
            keep: keep.max(1),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for a generation. Zero-padded so name order is generation order.
    pub fn file_name(generation: u64) -> String {
        format!("index-{:010}.{}", generation, EXTENSION)
    }

    /// Write a generation atomically (temp file, fsync, rename) and prune old files.
    pub fn write(&self, generation: &IndexGeneration) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let bytes = encode_generation(generation)?;

        let final_path = self.dir.join(Self::file_name(generation.generation()));
        let tmp_path = self
            .dir
            .join(format!(".{}.tmp", Self::file_name(generation.generation())));
        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        // INVARIANT: SNAPSHOT_WRITE_ATOMIC
        fs::rename(&tmp_path, &final_path)?;

        info!(
            path = %final_path.display(),
            generation = generation.generation(),
            records = generation.len(),
            bytes = bytes.len(),
            "wrote index snapshot"
        );
        self.prune()?;
        Ok(final_path)
    }

    /// Snapshot files in ascending generation order.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension().is_some_and(|ext| ext == EXTENSION)
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with("index-"))
            })
            .collect();
        files.sort();
        Ok(files)
    }

    /// The newest snapshot that passes validation. Corrupt files are skipped.
    pub fn load_latest(&self) -> Result<Option<(PathBuf, IndexGeneration)>> {
        for path in self.list()?.into_iter().rev() {
            match read_snapshot(&path) {
                Ok(generation) => {
                    info!(
                        path = %path.display(),
                        generation = generation.generation(),
                        records = generation.len(),
                        "loaded index snapshot"
                    );
                    return Ok(Some((path, generation)));
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable snapshot"),
            }
        }
        Ok(None)
    }

    fn prune(&self) -> Result<()> {
        let files = self.list()?;
        if files.len() <= self.keep {
            return Ok(());
        }
        for path in &files[..files.len() - self.keep] {
            match fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "pruned old snapshot"),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to prune snapshot"),
            }
        }
        Ok(())
    }
}
