// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::fmt;
use std::str::FromStr;

use log::debug;
use md5::Md5;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

use crate::demux::Frame;
use crate::manifest::TestVector;
use crate::Result;
use crate::VerifyError;

/// Digest algorithm used for the reference hash files.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Md5,
    Sha256,
}

impl HashAlgorithm {
    /// File name suffix of the reference hash file, without the dot.
    pub fn suffix(&self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha256 => "sha256",
        }
    }

    /// Length of a digest in hex characters.
    pub fn hex_len(&self) -> usize {
        match self {
            HashAlgorithm::Md5 => 32,
            HashAlgorithm::Sha256 => 64,
        }
    }

    /// Lowercase hex digest of `data`.
    pub fn digest_hex(&self, data: &[u8]) -> String {
        match self {
            HashAlgorithm::Md5 => hex::encode(Md5::digest(data)),
            HashAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(HashAlgorithm::Md5),
            "sha256" => Ok(HashAlgorithm::Sha256),
            _ => Err(format!("unsupported digest algorithm {:?}, expected md5 or sha256", s)),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Digest of one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRecord {
    pub index: u32,
    pub digest: String,
}

/// Hashes reassembled frames and checks them against a vector's references.
#[derive(Debug, Clone, Copy)]
pub struct Verifier {
    algorithm: HashAlgorithm,
}

impl Verifier {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn digest(&self, frame: &Frame) -> FrameRecord {
        FrameRecord { index: frame.index(), digest: self.algorithm.digest_hex(frame.as_bytes()) }
    }

    /// Checks every frame in order and returns how many matched.
    ///
    /// Stops at the first demux error or at the first mismatching frame,
    /// which is reported as `HashMismatch`.
    pub fn verify<I>(&self, vector: &TestVector, frames: I) -> Result<u32>
    where
        I: IntoIterator<Item = Result<Frame>>,
    {
        let mut matched = 0;
        for frame in frames {
            let record = self.digest(&frame?);
            let expected = vector.reference_hashes.get(record.index as usize).ok_or_else(|| {
                VerifyError::ManifestFormat {
                    origin: vector.name.clone(),
                    reason: format!("no reference hash for frame {}", record.index),
                }
            })?;
            debug!("{} frame {}: {}", vector.name, record.index, record.digest);
            if !expected.eq_ignore_ascii_case(&record.digest) {
                return Err(VerifyError::HashMismatch {
                    vector: vector.name.clone(),
                    frame: record.index,
                    expected: expected.clone(),
                    computed: record.digest,
                });
            }
            matched += 1;
        }
        Ok(matched)
    }
}
