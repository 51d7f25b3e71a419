// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Runs the decoder under test and hands out scratch paths for its output.

use std::fs;
use std::fs::File;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::process::Child;
use std::process::Command;
use std::process::ExitStatus;
use std::process::Stdio;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use log::info;
use log::warn;
use tempfile::TempDir;

use crate::Result;
use crate::VerifyError;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// An external decoder invoked as `decoder <input> <output>`.
#[derive(Debug, Clone)]
pub struct DecoderInvoker {
    executable: PathBuf,
    timeout: Option<Duration>,
}

impl DecoderInvoker {
    pub fn new(executable: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self { executable: executable.into(), timeout }
    }

    /// Decodes `input` into `output`, sending the decoder's stdout and stderr
    /// to `log_path`.
    ///
    /// Any previous `output` is removed first so that a failing decoder can
    /// never leave a stale stream behind. Only a zero exit status is a
    /// success.
    pub fn invoke(
        &self,
        vector: &str,
        input: &Path,
        output: &Path,
        log_path: &Path,
    ) -> Result<ExitStatus> {
        remove_if_exists(output)?;

        let log = File::create(log_path)
            .map_err(|err| VerifyError::io(format!("creating decoder log {:?}", log_path), err))?;
        let log_err = log
            .try_clone()
            .map_err(|err| VerifyError::io(format!("duplicating decoder log {:?}", log_path), err))?;

        let mut command = Command::new(&self.executable);
        command.arg(input).arg(output).stdin(Stdio::null()).stdout(log).stderr(log_err);
        info!("Executing command: {:?}", command);

        let mut child = command.spawn().map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => VerifyError::DecoderNotFound(self.executable.clone()),
            _ => VerifyError::io(format!("spawning decoder {:?}", self.executable), err),
        })?;

        let status = self.wait(vector, &mut child)?;
        if status.success() {
            Ok(status)
        } else {
            Err(VerifyError::DecoderFailed { vector: vector.to_string(), status: status.to_string() })
        }
    }

    fn wait(&self, vector: &str, child: &mut Child) -> Result<ExitStatus> {
        let wait_error = |err: io::Error| VerifyError::io(format!("waiting for decoder on {}", vector), err);
        let Some(timeout) = self.timeout else {
            return child.wait().map_err(wait_error);
        };

        let start = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if start.elapsed() >= timeout => {
                    warn!("Decoder({}) on {} exceeded {:?}, killing it", child.id(), vector, timeout);
                    if let Err(err) = child.kill() {
                        warn!("failed to kill decoder: {}", err);
                    }
                    if let Err(err) = child.wait() {
                        warn!("failed to reap decoder: {}", err);
                    }
                    return Err(VerifyError::DecoderTimeout {
                        vector: vector.to_string(),
                        seconds: timeout.as_secs(),
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(err) => return Err(wait_error(err)),
            }
        }
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(VerifyError::io(format!("removing stale output {:?}", path), err)),
    }
}

/// Raw output and decoder log of one vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchPaths {
    pub output: PathBuf,
    pub log: PathBuf,
}

impl ScratchPaths {
    pub fn remove(&self) {
        for path in [&self.output, &self.log] {
            if let Err(err) = remove_if_exists(path) {
                warn!("{}", err);
            }
        }
    }
}

/// Directory holding every vector's scratch files. Each vector gets its own
/// paths so that vectors can be decoded concurrently.
#[derive(Debug)]
pub struct ScratchSpace {
    dir: PathBuf,
    // Deletes the directory on drop when it was created by us.
    _temp: Option<TempDir>,
}

impl ScratchSpace {
    pub fn in_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|err| VerifyError::io(format!("creating scratch dir {:?}", dir), err))?;
        Ok(Self { dir, _temp: None })
    }

    /// A fresh temporary directory, deleted on drop unless `keep` is set.
    pub fn temporary(keep: bool) -> Result<Self> {
        let temp = tempfile::Builder::new()
            .prefix("decode-verify.")
            .keep(keep)
            .tempdir()
            .map_err(|err| VerifyError::io("creating scratch dir", err))?;
        Ok(Self { dir: temp.path().to_path_buf(), _temp: Some(temp) })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Paths for the vector at position `index` of the manifest.
    pub fn paths_for(&self, index: usize, vector: &str) -> ScratchPaths {
        let stem: String = vector
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
            .collect();
        let stem = format!("{:04}-{}", index, stem);
        ScratchPaths {
            output: self.dir.join(format!("{}.yuv", stem)),
            log: self.dir.join(format!("{}.log", stem)),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn successful_decode_writes_output() {
        let tmpdir = tempfile::tempdir().unwrap();
        let decoder = write_script(tmpdir.path(), "decoder", "echo decoding; cp \"$1\" \"$2\"");
        let input = tmpdir.path().join("in.bin");
        fs::write(&input, b"raw").unwrap();
        let paths = ScratchSpace::in_dir(tmpdir.path().join("scratch")).unwrap().paths_for(0, "in");

        let status = DecoderInvoker::new(decoder, None)
            .invoke("in", &input, &paths.output, &paths.log)
            .unwrap();
        assert!(status.success());
        assert_eq!(fs::read(&paths.output).unwrap(), b"raw");
        assert_eq!(fs::read_to_string(&paths.log).unwrap(), "decoding\n");
    }

    #[test]
    fn non_zero_exit_fails_and_removes_stale_output() {
        let tmpdir = tempfile::tempdir().unwrap();
        let decoder = write_script(tmpdir.path(), "decoder", "exit 3");
        let output = tmpdir.path().join("out.yuv");
        fs::write(&output, b"stale").unwrap();

        let result = DecoderInvoker::new(decoder, None).invoke(
            "v",
            &tmpdir.path().join("in.bin"),
            &output,
            &tmpdir.path().join("out.log"),
        );
        match result {
            Err(VerifyError::DecoderFailed { vector, status }) => {
                assert_eq!(vector, "v");
                assert!(status.contains('3'), "{}", status);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!output.exists());
    }

    #[test]
    fn missing_executable() {
        let tmpdir = tempfile::tempdir().unwrap();
        let missing = tmpdir.path().join("no-such-decoder");
        let result = DecoderInvoker::new(&missing, None).invoke(
            "v",
            &tmpdir.path().join("in.bin"),
            &tmpdir.path().join("out.yuv"),
            &tmpdir.path().join("out.log"),
        );
        assert!(matches!(result, Err(VerifyError::DecoderNotFound(path)) if path == missing));
    }

    #[test]
    fn hung_decoder_times_out() {
        let tmpdir = tempfile::tempdir().unwrap();
        let decoder = write_script(tmpdir.path(), "decoder", "exec sleep 30");
        let start = Instant::now();
        let result = DecoderInvoker::new(decoder, Some(Duration::from_millis(200))).invoke(
            "v",
            &tmpdir.path().join("in.bin"),
            &tmpdir.path().join("out.yuv"),
            &tmpdir.path().join("out.log"),
        );
        assert!(matches!(result, Err(VerifyError::DecoderTimeout { .. })));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn scratch_paths_are_unique_per_vector() {
        let scratch = ScratchSpace::temporary(false).unwrap();
        let a = scratch.paths_for(0, "inter/vp80-02-inter-1402.ivf");
        let b = scratch.paths_for(1, "inter/vp80-02-inter-1402.ivf");
        assert_ne!(a.output, b.output);
        assert_eq!(a.output.parent().unwrap(), scratch.dir());
        assert!(a.output.ends_with("0000-inter_vp80-02-inter-1402.ivf.yuv"));
    }

    #[test]
    fn temporary_scratch_is_removed_on_drop() {
        let scratch = ScratchSpace::temporary(false).unwrap();
        let dir = scratch.dir().to_path_buf();
        assert!(dir.is_dir());
        drop(scratch);
        assert!(!dir.exists());
    }
}
