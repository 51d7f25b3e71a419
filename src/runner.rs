// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Drives decode, demux and verification over a whole manifest.

use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use log::debug;
use log::error;
use log::info;
use log::warn;
use rayon::prelude::*;
use serde::Serialize;

use crate::demux::FrameDemuxer;
use crate::hash::HashAlgorithm;
use crate::hash::Verifier;
use crate::invoker::DecoderInvoker;
use crate::invoker::ScratchPaths;
use crate::invoker::ScratchSpace;
use crate::manifest::Manifest;
use crate::manifest::ManifestEntry;
use crate::manifest::ManifestRow;
use crate::manifest::TestVector;
use crate::Result;
use crate::VerifyError;

/// What to do with the rest of the batch once a vector fails.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Verify every vector and report all failures.
    #[default]
    Continue,
    /// Stop starting new vectors after the first failure.
    FailFast,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub decoder: PathBuf,
    /// Directory holding the vectors and their reference hash files.
    pub root: PathBuf,
    pub algorithm: HashAlgorithm,
    pub policy: FailurePolicy,
    /// Number of vectors processed concurrently.
    pub jobs: usize,
    /// Upper bound on one decoder run. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Keep raw outputs and decoder logs after verification.
    pub keep_scratch: bool,
}

impl RunConfig {
    pub fn new(decoder: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            decoder: decoder.into(),
            root: root.into(),
            algorithm: HashAlgorithm::default(),
            policy: FailurePolicy::default(),
            jobs: 1,
            timeout: None,
            keep_scratch: false,
        }
    }
}

/// First frame whose digest differs from its reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub frame: u32,
    pub expected: String,
    pub computed: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum VectorStatus {
    Passed,
    Mismatch(Mismatch),
    Error { kind: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    pub vector: String,
    /// Frames whose digest matched before the vector passed or failed.
    pub frames_verified: u32,
    pub status: VectorStatus,
}

impl VerificationResult {
    fn new(vector: &str, outcome: Result<u32>) -> Self {
        match outcome {
            Ok(frames_verified) => {
                Self { vector: vector.to_string(), frames_verified, status: VectorStatus::Passed }
            }
            Err(err) => Self::failed(vector, &err),
        }
    }

    fn failed(vector: &str, err: &VerifyError) -> Self {
        let (frames_verified, status) = match err {
            VerifyError::HashMismatch { frame, expected, computed, .. } => (
                *frame,
                VectorStatus::Mismatch(Mismatch {
                    frame: *frame,
                    expected: expected.clone(),
                    computed: computed.clone(),
                }),
            ),
            _ => {
                let frames = match err {
                    VerifyError::StreamTruncated { frame, .. } => *frame,
                    _ => 0,
                };
                (frames, VectorStatus::Error { kind: err.kind().to_string(), message: err.to_string() })
            }
        };
        Self { vector: vector.to_string(), frames_verified, status }
    }

    pub fn all_frames_matched(&self) -> bool {
        self.status == VectorStatus::Passed
    }

    pub fn first_mismatch(&self) -> Option<&Mismatch> {
        match &self.status {
            VectorStatus::Mismatch(mismatch) => Some(mismatch),
            _ => None,
        }
    }
}

/// Outcome of a whole batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub algorithm: HashAlgorithm,
    pub policy: FailurePolicy,
    /// Results in manifest order.
    pub results: Vec<VerificationResult>,
    /// Vectors never started because the batch stopped early.
    pub skipped: Vec<String>,
}

impl BatchReport {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.all_frames_matched()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0 && self.skipped.is_empty()
    }

    /// Process exit status: 0 when every vector passed, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.all_passed() {
            0
        } else {
            1
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            VerifyError::io(format!("serializing report {:?}", path), err.into())
        })?;
        fs::write(path, json)
            .map_err(|err| VerifyError::io(format!("writing report {:?}", path), err))
    }
}

pub struct BatchRunner {
    config: RunConfig,
    scratch: ScratchSpace,
    invoker: DecoderInvoker,
    verifier: Verifier,
}

impl BatchRunner {
    pub fn new(config: RunConfig, scratch: ScratchSpace) -> Self {
        let invoker = DecoderInvoker::new(config.decoder.clone(), config.timeout);
        let verifier = Verifier::new(config.algorithm);
        Self { config, scratch, invoker, verifier }
    }

    /// Verifies every row of `manifest`.
    pub fn run(&self, manifest: &Manifest) -> BatchReport {
        info!(
            "Verifying {} vectors from {} with {} job(s)",
            manifest.len(),
            manifest.origin(),
            self.config.jobs
        );
        let stop = AtomicBool::new(false);
        let rows = manifest.rows();

        let outcomes: Vec<Option<VerificationResult>> = if self.config.jobs > 1 {
            match rayon::ThreadPoolBuilder::new().num_threads(self.config.jobs).build() {
                Ok(pool) => pool.install(|| {
                    rows.par_iter()
                        .enumerate()
                        .map(|(index, row)| self.run_unless_stopped(index, row, &stop))
                        .collect()
                }),
                Err(err) => {
                    warn!("Failed to start {} workers, running serially: {}", self.config.jobs, err);
                    self.run_serially(rows, &stop)
                }
            }
        } else {
            self.run_serially(rows, &stop)
        };

        let mut report = BatchReport {
            algorithm: self.config.algorithm,
            policy: self.config.policy,
            results: Vec::with_capacity(rows.len()),
            skipped: Vec::new(),
        };
        for (row, outcome) in rows.iter().zip(outcomes) {
            match outcome {
                Some(result) => report.results.push(result),
                None => report.skipped.push(row.label.clone()),
            }
        }

        if !report.skipped.is_empty() {
            warn!("Stopped after first failure, {} vectors not run", report.skipped.len());
        }
        info!(
            "{} passed, {} failed, {} skipped",
            report.passed(),
            report.failed(),
            report.skipped.len()
        );
        report
    }

    fn run_serially(&self, rows: &[ManifestRow], stop: &AtomicBool) -> Vec<Option<VerificationResult>> {
        rows.iter()
            .enumerate()
            .map(|(index, row)| self.run_unless_stopped(index, row, stop))
            .collect()
    }

    fn run_unless_stopped(
        &self,
        index: usize,
        row: &ManifestRow,
        stop: &AtomicBool,
    ) -> Option<VerificationResult> {
        if stop.load(Ordering::SeqCst) {
            return None;
        }
        let result = self.run_row(index, row);
        if !result.all_frames_matched() && self.config.policy == FailurePolicy::FailFast {
            stop.store(true, Ordering::SeqCst);
        }
        Some(result)
    }

    /// Verifies one manifest row and logs its progress line.
    pub fn run_row(&self, index: usize, row: &ManifestRow) -> VerificationResult {
        debug!("Testing {}", row.label);
        let result = match &row.entry {
            Ok(entry) => VerificationResult::new(&row.label, self.check_vector(index, entry)),
            Err(err) => VerificationResult::failed(&row.label, err),
        };

        match &result.status {
            VectorStatus::Passed => {
                info!("[PASS] {} ({} frames)", result.vector, result.frames_verified)
            }
            VectorStatus::Mismatch(m) => {
                let resolution = row.entry.as_ref().map(|entry| entry.resolution).unwrap_or_default();
                error!(
                    "[FAIL] {} frame {}: expected {}, computed {} at {}",
                    result.vector, m.frame, m.expected, m.computed, resolution
                )
            }
            VectorStatus::Error { kind, message } => {
                error!("[FAIL] {} ({}): {}", result.vector, kind, message)
            }
        }
        result
    }

    fn check_vector(&self, index: usize, entry: &ManifestEntry) -> Result<u32> {
        let vector = TestVector::load(entry, &self.config.root, self.config.algorithm)?;
        let input = self.config.root.join(&vector.name);
        if !input.is_file() {
            return Err(VerifyError::io(
                format!("opening vector {:?}", input),
                std::io::ErrorKind::NotFound.into(),
            ));
        }

        let paths = self.scratch.paths_for(index, &vector.name);
        let outcome = self.decode_and_verify(&vector, &input, &paths);
        if !self.config.keep_scratch {
            paths.remove();
        }
        outcome
    }

    fn decode_and_verify(&self, vector: &TestVector, input: &Path, paths: &ScratchPaths) -> Result<u32> {
        self.invoker.invoke(&vector.name, input, &paths.output, &paths.log)?;

        let output = File::open(&paths.output)
            .map_err(|err| VerifyError::io(format!("opening decoder output {:?}", paths.output), err))?;
        let mut demuxer = FrameDemuxer::for_vector(BufReader::new(output), vector);
        let matched = self.verifier.verify(vector, demuxer.by_ref())?;

        let trailing = demuxer.trailing_bytes()?;
        if trailing > 0 {
            warn!("{}: {} bytes after the last frame ignored", vector.name, trailing);
        }
        Ok(matched)
    }
}
