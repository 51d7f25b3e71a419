// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::Resolution;

/// Everything that can fail a single test vector.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("malformed descriptor in {origin}: {reason}")]
    ManifestFormat { origin: String, reason: String },
    #[error("decoder executable not found: {0:?}")]
    DecoderNotFound(PathBuf),
    #[error("decoder failed on {vector}: {status}")]
    DecoderFailed { vector: String, status: String },
    #[error("decoder timed out on {vector} after {seconds}s")]
    DecoderTimeout { vector: String, seconds: u64 },
    #[error("raw output of {vector} ends inside frame {frame}")]
    StreamTruncated { vector: String, frame: u32 },
    #[error("{vector} frame {frame}: expected {expected}, computed {computed}")]
    HashMismatch { vector: String, frame: u32, expected: String, computed: String },
    #[error("{context}: {err}")]
    Io {
        context: String,
        #[source]
        err: io::Error,
    },
}

impl VerifyError {
    pub(crate) fn io(context: impl Into<String>, err: io::Error) -> Self {
        VerifyError::Io { context: context.into(), err }
    }

    pub(crate) fn frame_too_large(origin: impl Into<String>, resolution: Resolution) -> Self {
        VerifyError::ManifestFormat {
            origin: origin.into(),
            reason: format!("frame size {} is too large", resolution),
        }
    }

    /// Coarse category used in progress lines and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            VerifyError::ManifestFormat { .. } => "manifest-format",
            VerifyError::DecoderNotFound(_)
            | VerifyError::DecoderFailed { .. }
            | VerifyError::DecoderTimeout { .. } => "subprocess",
            VerifyError::StreamTruncated { .. } => "stream-truncated",
            VerifyError::HashMismatch { .. } => "hash-mismatch",
            VerifyError::Io { .. } => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, VerifyError>;
