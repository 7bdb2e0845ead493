#![allow(dead_code)]

use std::path::PathBuf;

pub const RPC_PATH: &str = "/public/api.jsonrpc";

pub const INVALID_PARAMS: &str =
    r#"{"jsonrpc":"2.0","error":{"code":-32602,"message":"Invalid params"},"id":null}"#;

pub fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
}
