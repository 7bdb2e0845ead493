mod common;

use assert_cmd::prelude::*;
use common::{INVALID_PARAMS, RPC_PATH, fixture};
use httpmock::{Method::POST, MockServer};
use predicates::prelude::*;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn cli_shows_help() {
    let mut cmd = Command::cargo_bin("pxstat").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("pxstat"));
}

#[test]
fn cli_fetch_prints_csv() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(RPC_PATH);
        then.status(200).body(fixture("e3002_response.json"));
    });
    let dir = tempdir().unwrap();
    let query = dir.path().join("q.json");
    std::fs::write(&query, fixture("e3002_query.json")).unwrap();

    let url = server.url(RPC_PATH);
    let mut cmd = Command::cargo_bin("pxstat").unwrap();
    cmd.args(["fetch", "--endpoint", url.as_str(), "--stats", "--query"])
        .arg(&query);
    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("Statistic,CensusYear,Sex"))
        .stdout(predicate::str::contains("Male,All ages"))
        .stderr(predicate::str::contains("count=4"));
}

#[test]
fn cli_reports_api_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(RPC_PATH);
        then.status(200)
            .body(INVALID_PARAMS);
    });

    let url = server.url(RPC_PATH);
    let mut cmd = assert_cmd::Command::cargo_bin("pxstat").unwrap();
    cmd.args(["fetch", "--endpoint", url.as_str(), "--query", "-"])
        .write_stdin(r#"{"jsonrpc":"2.0"}"#);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid params"));
}

#[test]
fn cli_raw_rejects_table_output_flags() {
    let mut cmd = Command::cargo_bin("pxstat").unwrap();
    cmd.args(["fetch", "--query", "-", "--raw", "--out", "table.csv"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}
