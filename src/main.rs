// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! decode-verify, checks a decoder's raw output frame by frame against
//! reference hashes.

use std::env;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::anyhow;
use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use argh::FromArgs;
use log::error;
use log::info;

use decode_verify::hash::HashAlgorithm;
use decode_verify::invoker::ScratchSpace;
use decode_verify::manifest::Manifest;
use decode_verify::runner::BatchReport;
use decode_verify::runner::BatchRunner;
use decode_verify::runner::FailurePolicy;
use decode_verify::runner::RunConfig;
use decode_verify::suites;

const ROOT_ENV: &str = "TEST_VECTOR_ROOT";

#[derive(FromArgs, Debug)]
/// decode every test vector and compare each output frame with its reference hash.
struct Args {
    /// decoder executable, run as `<decoder> <input> <output>`
    #[argh(option)]
    decoder: PathBuf,

    /// directory with the vectors and their hash files (default: $TEST_VECTOR_ROOT)
    #[argh(option)]
    root: Option<PathBuf>,

    /// tab-separated vector descriptions
    #[argh(option)]
    manifest: Option<PathBuf>,

    /// built-in vector table to use instead of a manifest
    #[argh(option)]
    suite: Option<String>,

    /// digest algorithm of the reference files: md5 or sha256
    #[argh(option, default = "HashAlgorithm::Md5")]
    digest: HashAlgorithm,

    /// stop the batch at the first failing vector
    #[argh(switch)]
    fail_fast: bool,

    /// number of vectors verified in parallel
    #[argh(option, default = "1")]
    jobs: usize,

    /// seconds before a decoder run is killed, 0 to wait forever
    #[argh(option, default = "300")]
    timeout_secs: u64,

    /// directory for raw decoder output (default: a temporary directory)
    #[argh(option)]
    scratch_dir: Option<PathBuf>,

    /// keep raw outputs and decoder logs
    #[argh(switch)]
    keep_scratch: bool,

    /// only verify vectors whose name contains this string
    #[argh(option)]
    filter: Option<String>,

    /// write a JSON report to this path
    #[argh(option)]
    report: Option<PathBuf>,
}

fn load_manifest(args: &Args, root: &Path) -> Result<Manifest> {
    let mut manifest = match (&args.manifest, &args.suite) {
        (Some(path), None) => {
            let path = if path.is_relative() && !path.exists() { root.join(path) } else { path.clone() };
            Manifest::from_file(&path)?
        }
        (None, Some(name)) => suites::suite(name).ok_or_else(|| {
            anyhow!("unknown suite {:?}, available: {}", name, suites::SUITE_NAMES.join(", "))
        })?,
        _ => bail!("exactly one of --manifest and --suite is required"),
    };
    if let Some(pattern) = &args.filter {
        manifest.filter(pattern);
    }
    Ok(manifest)
}

fn run(args: Args) -> Result<BatchReport> {
    let root = match &args.root {
        Some(root) => root.clone(),
        None => env::var_os(ROOT_ENV)
            .map(PathBuf::from)
            .with_context(|| format!("--root not given and ${} is not set", ROOT_ENV))?,
    };
    if !root.is_dir() {
        bail!("vector root {:?} is not a directory", root);
    }
    if args.jobs == 0 {
        bail!("--jobs must be at least 1");
    }

    let manifest = load_manifest(&args, &root).context("Unable to load test vectors")?;
    let scratch = match &args.scratch_dir {
        Some(dir) => ScratchSpace::in_dir(dir)?,
        None => ScratchSpace::temporary(args.keep_scratch)?,
    };
    info!("Raw decoder output goes to {:?}", scratch.dir());

    let config = RunConfig {
        decoder: args.decoder.clone(),
        root,
        algorithm: args.digest,
        policy: if args.fail_fast { FailurePolicy::FailFast } else { FailurePolicy::Continue },
        jobs: args.jobs,
        timeout: (args.timeout_secs > 0).then(|| Duration::from_secs(args.timeout_secs)),
        keep_scratch: args.keep_scratch,
    };
    let report = BatchRunner::new(config, scratch).run(&manifest);

    if let Some(path) = &args.report {
        report.write_json(path).context("Unable to write report")?;
    }
    Ok(report)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Args = argh::from_env();

    match run(args) {
        Ok(report) => ExitCode::from(report.exit_code()),
        Err(err) => {
            error!("{:?}", err);
            ExitCode::from(1)
        }
    }
}
