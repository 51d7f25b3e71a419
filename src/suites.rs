// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Built-in vector tables for suites that ship without a manifest.

use lazy_static::lazy_static;

use crate::manifest::Manifest;
use crate::manifest::ManifestEntry;

pub const VP8_COMPREHENSIVE: &str = "vp8-comprehensive";

/// Every suite accepted by [`suite`].
pub const SUITE_NAMES: &[&str] = &[VP8_COMPREHENSIVE];

// (frame count, width, height) of vp80-00-comprehensive-001.ivf onwards.
const VP8_COMPREHENSIVE_GEOMETRY: &[(u32, u32, u32)] = &[
    (29, 176, 144),
    (49, 176, 144),
    (49, 176, 144),
    (29, 176, 144),
    (49, 176, 144),
    (48, 175, 143),
    (29, 176, 144),
    (2, 1432, 888),
    (49, 176, 144),
    (57, 320, 240),
    (29, 176, 144),
    (29, 176, 144),
    (29, 176, 144),
    (49, 175, 143),
    (260, 320, 240),
    (29, 176, 144),
    (29, 176, 144),
];

lazy_static! {
    static ref VP8_COMPREHENSIVE_ENTRIES: Vec<ManifestEntry> = VP8_COMPREHENSIVE_GEOMETRY
        .iter()
        .enumerate()
        .map(|(i, &(frames, width, height))| {
            ManifestEntry::new(format!("vp80-00-comprehensive-{:03}.ivf", i + 1), frames, width, height)
        })
        .collect();
}

/// Returns the manifest of a built-in suite, or `None` for an unknown name.
pub fn suite(name: &str) -> Option<Manifest> {
    match name {
        VP8_COMPREHENSIVE => {
            Some(Manifest::from_entries(name, VP8_COMPREHENSIVE_ENTRIES.iter().cloned()))
        }
        _ => None,
    }
}
