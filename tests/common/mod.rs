// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

// Helpers shared by the batch and CLI tests. Vectors are stored as raw I420
// so that `cp` can stand in for a decoder.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use decode_verify::hash::HashAlgorithm;
use decode_verify::manifest::ManifestEntry;
use decode_verify::Resolution;
use tempfile::TempDir;

/// A decoder that copies its input to its output.
pub const COPY_DECODER: &str = "cp";
/// A decoder that always exits with status 1.
pub const FAILING_DECODER: &str = "false";

/// Deterministic content for one frame.
pub fn frame_data(seed: u32, resolution: Resolution) -> Vec<u8> {
    (0..resolution.frame_len().unwrap() as u32)
        .map(|i| (i.wrapping_mul(31).wrapping_add(seed.wrapping_mul(17)) % 251) as u8)
        .collect()
}

pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self { dir: tempfile::tempdir().unwrap() }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Writes a vector whose "encoded" file is its raw frames and whose
    /// `.md5` file holds the matching digests. Returns the frames.
    pub fn add_vector(&self, entry: &ManifestEntry) -> Vec<Vec<u8>> {
        let frames: Vec<Vec<u8>> = (0..entry.frame_count)
            .map(|i| frame_data(i + entry.name.len() as u32, entry.resolution))
            .collect();
        fs::write(self.root().join(&entry.name), frames.concat()).unwrap();
        let hashes: Vec<String> =
            frames.iter().map(|f| HashAlgorithm::Md5.digest_hex(f)).collect();
        self.write_hashes(&entry.name, &hashes);
        frames
    }

    pub fn write_hashes(&self, name: &str, hashes: &[String]) {
        let mut text = String::new();
        for hash in hashes {
            text.push_str(hash);
            text.push('\n');
        }
        fs::write(self.root().join(format!("{}.md5", name)), text).unwrap();
    }

    /// Replaces the reference hash of `frame` with one that cannot match.
    pub fn corrupt_hash(&self, name: &str, frame: usize) {
        let path = self.root().join(format!("{}.md5", name));
        let mut hashes: Vec<String> =
            fs::read_to_string(&path).unwrap().lines().map(str::to_string).collect();
        hashes[frame] = "0".repeat(32);
        self.write_hashes(name, &hashes);
    }

    /// Writes a manifest in the tab-separated description format.
    pub fn write_manifest(&self, file: &str, entries: &[ManifestEntry]) -> PathBuf {
        let mut text = String::new();
        for entry in entries {
            text.push_str(&format!(
                "{}\tvp8_test\tgenerated\t{}\t{}\t{}\n",
                entry.name, entry.frame_count, entry.resolution.height, entry.resolution.width
            ));
        }
        let path = self.root().join(file);
        fs::write(&path, text).unwrap();
        path
    }
}
