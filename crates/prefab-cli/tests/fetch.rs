use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use httptest::{matchers::request, responders::status_code, Expectation, Server};
use serde_json::Value;
use sha2::{Digest, Sha256};

mod common;

use common::{have_tool, tar_gz_bytes, zip_bytes};

fn serve(server: &Server, path: &'static str, body: Vec<u8>) -> String {
    server.expect(
        Expectation::matching(request::method_path("GET", path))
            .respond_with(status_code(200).body(body)),
    );
    server.url_str(path)
}

#[test]
fn fetch_unpacks_a_tar_gz_archive_end_to_end() {
    if !have_tool("tar") {
        eprintln!("skipping fetch test (tar not found)");
        return;
    }
    let server = Server::run();
    let url = serve(&server, "/pkg.tar.gz", tar_gz_bytes(&[("pkg/hello.txt", "hi")]));

    let temp = tempfile::tempdir().expect("tempdir");
    cargo_bin_cmd!("prefab")
        .args(["fetch", &url, "--name", "out"])
        .arg("--dest")
        .arg(temp.path())
        .assert()
        .success();

    let unpacked = temp.path().join("out/pkg/hello.txt");
    assert_eq!(fs::read_to_string(unpacked).expect("unpacked file"), "hi");
}

#[test]
fn fetch_without_a_name_uses_the_rule_identifier() {
    if !have_tool("tar") {
        eprintln!("skipping fetch test (tar not found)");
        return;
    }
    let server = Server::run();
    let url = serve(&server, "/pkg.tar.gz", tar_gz_bytes(&[("pkg/hello.txt", "hi")]));

    let temp = tempfile::tempdir().expect("tempdir");
    cargo_bin_cmd!("prefab")
        .args(["fetch", &url, "--rule-name", "third-party-pkg"])
        .arg("--dest")
        .arg(temp.path())
        .assert()
        .success();

    assert!(temp.path().join("third-party-pkg/pkg/hello.txt").exists());
}

#[test]
fn verified_fetch_is_cacheable_and_unverified_is_local_only() {
    if !have_tool("tar") {
        eprintln!("skipping fetch test (tar not found)");
        return;
    }
    let body = tar_gz_bytes(&[("pkg/hello.txt", "hi")]);
    let sha256 = hex::encode(Sha256::digest(&body));

    let server = Server::run();
    let url = serve(&server, "/verified.tar.gz", body.clone());
    let temp = tempfile::tempdir().expect("tempdir");
    let assert = cargo_bin_cmd!("prefab")
        .args(["--json", "fetch", &url, "--sha256", &sha256, "--name", "v"])
        .arg("--dest")
        .arg(temp.path())
        .assert()
        .success();
    let payload: Value = serde_json::from_slice(&assert.get_output().stdout).expect("json");
    assert_eq!(payload["execution_mode"].as_str(), Some("cacheable"));
    assert_eq!(payload["sha256"].as_str(), Some(sha256.as_str()));

    let server = Server::run();
    let url = serve(&server, "/unverified.tar.gz", body);
    let assert = cargo_bin_cmd!("prefab")
        .args(["--json", "fetch", &url, "--name", "u"])
        .arg("--dest")
        .arg(temp.path())
        .assert()
        .success();
    let payload: Value = serde_json::from_slice(&assert.get_output().stdout).expect("json");
    assert_eq!(payload["execution_mode"].as_str(), Some("local_only"));
}

#[test]
fn fetch_rejects_a_sha256_mismatch() {
    let server = Server::run();
    let url = serve(&server, "/pkg.tar.gz", tar_gz_bytes(&[("pkg/hello.txt", "hi")]));

    let temp = tempfile::tempdir().expect("tempdir");
    let assert = cargo_bin_cmd!("prefab")
        .args(["fetch", &url, "--sha256", &"0".repeat(64)])
        .arg("--dest")
        .arg(temp.path())
        .assert()
        .code(2);
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("sha256 mismatch"), "got: {stderr}");
    assert!(!temp.path().join("archive").exists(), "no partial output");
}

#[test]
fn fetch_rejects_multiple_urls_before_any_download() {
    let temp = tempfile::tempdir().expect("tempdir");
    // Unroutable urls: validation must fire before any connection attempt.
    let assert = cargo_bin_cmd!("prefab")
        .args([
            "fetch",
            "https://192.0.2.1/a.tar.gz",
            "https://192.0.2.1/b.tar.gz",
        ])
        .arg("--dest")
        .arg(temp.path())
        .assert()
        .code(1);
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("multiple urls"), "got: {stderr}");
}

#[test]
fn fetch_rejects_strip_prefix() {
    let temp = tempfile::tempdir().expect("tempdir");
    let assert = cargo_bin_cmd!("prefab")
        .args([
            "fetch",
            "https://192.0.2.1/a.tar.gz",
            "--strip-prefix",
            "a-1.0",
        ])
        .arg("--dest")
        .arg(temp.path())
        .assert()
        .code(1);
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("strip_prefix"), "got: {stderr}");
    assert!(stderr.contains("a-1.0"), "got: {stderr}");
}

#[test]
fn fetch_rejects_excludes_on_zip_archives() {
    let temp = tempfile::tempdir().expect("tempdir");
    let assert = cargo_bin_cmd!("prefab")
        .args([
            "fetch",
            "https://192.0.2.1/a.zip",
            "--exclude",
            "docs/.*",
        ])
        .arg("--dest")
        .arg(temp.path())
        .assert()
        .code(1);
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("zip"), "got: {stderr}");
}

#[test]
fn fetch_rejects_an_unknown_archive_type_override() {
    let temp = tempfile::tempdir().expect("tempdir");
    let assert = cargo_bin_cmd!("prefab")
        .args([
            "fetch",
            "https://192.0.2.1/a.tar.gz",
            "--archive-type",
            "rar",
        ])
        .arg("--dest")
        .arg(temp.path())
        .assert()
        .code(1);
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("rar"), "got: {stderr}");
}

#[test]
fn explicit_zip_override_wins_over_the_inferred_tar_type() {
    if !have_tool("unzip") {
        eprintln!("skipping zip override test (unzip not found)");
        return;
    }
    // Served under a .tar.gz path, but the payload and override say zip.
    let server = Server::run();
    let url = serve(&server, "/pkg.tar.gz", zip_bytes(&[("pkg/hello.txt", "hi")]));

    let temp = tempfile::tempdir().expect("tempdir");
    cargo_bin_cmd!("prefab")
        .args(["fetch", &url, "--archive-type", "zip", "--name", "out"])
        .arg("--dest")
        .arg(temp.path())
        .assert()
        .success();

    let unpacked = temp.path().join("out/pkg/hello.txt");
    assert_eq!(fs::read_to_string(unpacked).expect("unpacked file"), "hi");
}

#[test]
fn excluded_members_are_missing_from_the_unpacked_tree() {
    if !have_tool("tar") {
        eprintln!("skipping excludes test (tar not found)");
        return;
    }
    let server = Server::run();
    let url = serve(
        &server,
        "/pkg.tar.gz",
        tar_gz_bytes(&[
            ("pkg/src/lib.c", "int x;"),
            ("pkg/docs/index.html", "<html>"),
        ]),
    );

    let temp = tempfile::tempdir().expect("tempdir");
    cargo_bin_cmd!("prefab")
        .env(
            "PREFAB_EXCLUSIONS_BIN",
            env!("CARGO_BIN_EXE_prefab-exclusions"),
        )
        .args(["fetch", &url, "--exclude", "docs/", "--name", "out"])
        .arg("--dest")
        .arg(temp.path())
        .assert()
        .success();

    assert!(temp.path().join("out/pkg/src/lib.c").exists());
    assert!(!temp.path().join("out/pkg/docs/index.html").exists());
}
