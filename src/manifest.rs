// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Test vector descriptors and their reference hash files.
//!
//! A manifest is a tab-separated table with one vector per row. Only four
//! columns are read: the vector file name (0), the frame count (3), the plane
//! height (4) and the plane width (5). The reference hashes for a vector live
//! beside it in `<name>.<digest suffix>`, one hex digest per line.

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use log::warn;
use serde::Deserialize;
use serde::Serialize;

use crate::hash::HashAlgorithm;
use crate::Resolution;
use crate::Result;
use crate::VerifyError;

const NAME_COLUMN: usize = 0;
const FRAME_COUNT_COLUMN: usize = 3;
const HEIGHT_COLUMN: usize = 4;
const WIDTH_COLUMN: usize = 5;
const MIN_COLUMNS: usize = 6;

/// Geometry of one vector as described by the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub frame_count: u32,
    pub resolution: Resolution,
}

impl ManifestEntry {
    pub fn new(name: impl Into<String>, frame_count: u32, width: u32, height: u32) -> Self {
        Self { name: name.into(), frame_count, resolution: Resolution::new(width, height) }
    }
}

/// One manifest row. A malformed row keeps its error so that only the
/// vector it describes fails.
#[derive(Debug)]
pub struct ManifestRow {
    pub label: String,
    pub entry: Result<ManifestEntry>,
}

#[derive(Debug)]
pub struct Manifest {
    origin: String,
    rows: Vec<ManifestRow>,
}

impl Manifest {
    pub fn parse(origin: &str, text: &str) -> Self {
        let rows = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim_end_matches('\r')))
            .filter(|(_, line)| !line.trim().is_empty() && !line.starts_with('#'))
            .map(|(line_no, line)| parse_row(origin, line_no, line))
            .collect();
        Self { origin: origin.to_string(), rows }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|err| VerifyError::io(format!("reading manifest {:?}", path), err))?;
        Ok(Self::parse(&path.display().to_string(), &text))
    }

    /// Builds a manifest from a static table.
    pub fn from_entries(origin: &str, entries: impl IntoIterator<Item = ManifestEntry>) -> Self {
        let rows = entries
            .into_iter()
            .map(|entry| ManifestRow { label: entry.name.clone(), entry: Ok(entry) })
            .collect();
        Self { origin: origin.to_string(), rows }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn rows(&self) -> &[ManifestRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keeps only the rows whose label contains `pattern`.
    pub fn filter(&mut self, pattern: &str) {
        self.rows.retain(|row| row.label.contains(pattern));
    }
}

fn parse_row(origin: &str, line_no: usize, line: &str) -> ManifestRow {
    let columns: Vec<&str> = line.split('\t').collect();
    let name = columns[NAME_COLUMN].trim();
    let label = if name.is_empty() { format!("{}:{}", origin, line_no) } else { name.to_string() };
    let position = format!("{}:{}", origin, line_no);

    let entry = if columns.len() < MIN_COLUMNS {
        Err(VerifyError::ManifestFormat {
            origin: position,
            reason: format!("expected at least {} columns, found {}", MIN_COLUMNS, columns.len()),
        })
    } else if name.is_empty() {
        Err(VerifyError::ManifestFormat { origin: position, reason: "empty vector name".to_string() })
    } else {
        parse_numeric(&position, "frame count", columns[FRAME_COUNT_COLUMN]).and_then(|frame_count| {
            let height = parse_numeric(&position, "height", columns[HEIGHT_COLUMN])?;
            let width = parse_numeric(&position, "width", columns[WIDTH_COLUMN])?;
            let entry = ManifestEntry::new(name, frame_count, width, height);
            entry.resolution.frame_len().ok_or_else(|| {
                VerifyError::frame_too_large(position.as_str(), entry.resolution)
            })?;
            Ok(entry)
        })
    };
    ManifestRow { label, entry }
}

fn parse_numeric(origin: &str, field: &str, value: &str) -> Result<u32> {
    value.trim().parse::<u32>().map_err(|err| VerifyError::ManifestFormat {
        origin: origin.to_string(),
        reason: format!("{} {:?} is not a number: {}", field, value, err),
    })
}

/// A vector with its reference hashes, ready to verify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestVector {
    pub name: String,
    pub frame_count: u32,
    pub resolution: Resolution,
    /// One digest per frame, `reference_hashes.len() == frame_count`.
    pub reference_hashes: Vec<String>,
}

impl TestVector {
    /// Pairs `entry` with its hashes. Extra hashes are dropped with a
    /// warning, missing ones are a format error.
    pub fn new(entry: &ManifestEntry, mut reference_hashes: Vec<String>) -> Result<Self> {
        entry
            .resolution
            .frame_len()
            .ok_or_else(|| VerifyError::frame_too_large(entry.name.as_str(), entry.resolution))?;
        let frame_count = entry.frame_count as usize;
        if reference_hashes.len() < frame_count {
            return Err(VerifyError::ManifestFormat {
                origin: entry.name.clone(),
                reason: format!(
                    "{} frames declared but only {} reference hashes",
                    frame_count,
                    reference_hashes.len()
                ),
            });
        }
        if reference_hashes.len() > frame_count {
            warn!(
                "{}: ignoring {} reference hashes past frame {}",
                entry.name,
                reference_hashes.len() - frame_count,
                frame_count
            );
            reference_hashes.truncate(frame_count);
        }
        Ok(Self {
            name: entry.name.clone(),
            frame_count: entry.frame_count,
            resolution: entry.resolution,
            reference_hashes,
        })
    }

    /// Location of the reference hash file for `name` under `root`.
    pub fn reference_path(root: &Path, name: &str, algorithm: HashAlgorithm) -> PathBuf {
        root.join(format!("{}.{}", name, algorithm.suffix()))
    }

    pub fn load(entry: &ManifestEntry, root: &Path, algorithm: HashAlgorithm) -> Result<Self> {
        let path = Self::reference_path(root, &entry.name, algorithm);
        let text = fs::read_to_string(&path)
            .map_err(|err| VerifyError::io(format!("reading reference hashes {:?}", path), err))?;
        let hashes = parse_reference_hashes(&path.display().to_string(), &text, algorithm)?;
        Self::new(entry, hashes)
    }
}

/// Reads one digest per non-empty line. Anything after the first
/// whitespace-separated token (e.g. a file name) is ignored.
pub fn parse_reference_hashes(
    origin: &str,
    text: &str,
    algorithm: HashAlgorithm,
) -> Result<Vec<String>> {
    let mut hashes = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let Some(token) = line.split_whitespace().next() else {
            continue;
        };
        if token.len() != algorithm.hex_len() || !token.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(VerifyError::ManifestFormat {
                origin: format!("{}:{}", origin, i + 1),
                reason: format!("{:?} is not a {} digest", token, algorithm),
            });
        }
        hashes.push(token.to_string());
    }
    Ok(hashes)
}
