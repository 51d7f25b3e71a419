// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

#![cfg(unix)]

mod common;

use std::fs;
use std::path::Path;
use std::process::Command;
use std::process::Output;

use decode_verify::manifest::ManifestEntry;

use common::Fixture;
use common::COPY_DECODER;

const BINARY: &str = env!("CARGO_BIN_EXE_decode-verify");

fn decode_verify(args: &[&str]) -> Output {
    let _ = env_logger::builder().is_test(true).try_init();
    let output = Command::new(BINARY)
        .args(args)
        .env_remove("TEST_VECTOR_ROOT")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run decode-verify");
    log::info!("decode-verify {:?} exited with {:?}", args, output.status);
    output
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

fn vectors(fixture: &Fixture) -> String {
    let entries = vec![ManifestEntry::new("a.ivf", 2, 4, 4), ManifestEntry::new("b.ivf", 3, 6, 2)];
    for entry in &entries {
        fixture.add_vector(entry);
    }
    path_arg(&fixture.write_manifest("descriptions.tsv", &entries))
}

#[test]
fn all_vectors_pass() {
    let fixture = Fixture::new();
    let manifest = vectors(&fixture);
    let root = path_arg(fixture.root());

    let output = decode_verify(&["--decoder", COPY_DECODER, "--root", &root, "--manifest", &manifest]);
    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));
}

#[test]
fn mismatch_exits_one_and_writes_report() {
    let fixture = Fixture::new();
    let manifest = vectors(&fixture);
    fixture.corrupt_hash("b.ivf", 1);
    let root = path_arg(fixture.root());
    let report = fixture.root().join("report.json");

    let output = decode_verify(&[
        "--decoder",
        COPY_DECODER,
        "--root",
        &root,
        "--manifest",
        &manifest,
        "--jobs",
        "2",
        "--report",
        &path_arg(&report),
    ]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("b.ivf frame 1"), "{}", stderr);
    assert!(stderr.contains("at 6x2"), "{}", stderr);

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(report).unwrap()).unwrap();
    assert_eq!(json["results"][0]["status"]["status"], "passed");
    assert_eq!(json["results"][1]["status"]["status"], "mismatch");
}

#[test]
fn relative_manifest_resolves_under_root() {
    let fixture = Fixture::new();
    vectors(&fixture);
    let root = path_arg(fixture.root());

    let output =
        decode_verify(&["--decoder", COPY_DECODER, "--root", &root, "--manifest", "descriptions.tsv"]);
    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));
}

#[test]
fn root_from_environment() {
    let fixture = Fixture::new();
    let manifest = vectors(&fixture);

    let output = Command::new(BINARY)
        .args(["--decoder", COPY_DECODER, "--manifest", manifest.as_str()])
        .env_remove("RUST_LOG")
        .env("TEST_VECTOR_ROOT", fixture.root())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));
}

#[test]
fn setup_errors_exit_one() {
    let fixture = Fixture::new();
    let manifest = vectors(&fixture);
    let root = path_arg(fixture.root());

    // Neither a manifest nor a suite.
    let output = decode_verify(&["--decoder", COPY_DECODER, "--root", &root]);
    assert_eq!(output.status.code(), Some(1));

    // Both a manifest and a suite.
    let output = decode_verify(&[
        "--decoder",
        COPY_DECODER,
        "--root",
        &root,
        "--manifest",
        &manifest,
        "--suite",
        "vp8-comprehensive",
    ]);
    assert_eq!(output.status.code(), Some(1));

    // No root at all.
    let output = decode_verify(&["--decoder", COPY_DECODER, "--manifest", &manifest]);
    assert_eq!(output.status.code(), Some(1));

    let output =
        decode_verify(&["--decoder", COPY_DECODER, "--root", &root, "--suite", "no-such-suite"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn built_in_suite_with_missing_vectors_fails() {
    let fixture = Fixture::new();
    let root = path_arg(fixture.root());

    let output = decode_verify(&[
        "--decoder",
        COPY_DECODER,
        "--root",
        &root,
        "--suite",
        "vp8-comprehensive",
        "--filter",
        "-001",
    ]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("vp80-00-comprehensive-001.ivf"), "{}", stderr);
    assert!(!stderr.contains("vp80-00-comprehensive-002.ivf"), "{}", stderr);
}
