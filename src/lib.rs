// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Conformance checking of a video decoder's raw I420 output.
//!
//! Each test vector is decoded by an external decoder executable. The raw
//! planar stream it writes is cut into frames, every frame is hashed in
//! canonical Y, U, V order, and the digests are compared with the reference
//! hashes stored beside the vector.

use serde::Deserialize;
use serde::Serialize;

pub mod demux;
pub mod error;
pub mod hash;
pub mod invoker;
pub mod manifest;
pub mod runner;
pub mod suites;

pub use error::Result;
pub use error::VerifyError;

/// Luma dimensions of a planar 4:2:0 frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of bytes in the luma plane, `None` if it does not fit in `usize`.
    pub fn luma_len(&self) -> Option<usize> {
        (self.width as usize).checked_mul(self.height as usize)
    }

    /// Dimensions of each chroma plane. Odd sizes truncate.
    pub fn chroma_resolution(&self) -> Resolution {
        Resolution { width: self.width / 2, height: self.height / 2 }
    }

    /// Number of bytes in one chroma plane.
    pub fn chroma_len(&self) -> Option<usize> {
        self.chroma_resolution().luma_len()
    }

    /// Number of bytes of one whole frame: Y, then U, then V. `None` when the
    /// geometry is too large to address.
    pub fn frame_len(&self) -> Option<usize> {
        self.chroma_len()?.checked_mul(2)?.checked_add(self.luma_len()?)
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
