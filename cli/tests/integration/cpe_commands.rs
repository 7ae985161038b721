//! Policy engine commands against a bus with no engine.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use predicates::prelude::*;

use crate::sandbox::Sandbox;

#[test]
fn test_stop_without_policy_engine_exits_three() {
    let sb = Sandbox::new();
    sb.cmd().args(["deployable", "create", "shop"]).assert().success();

    sb.cmd()
        .args(["deployable", "stop", "shop"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Policy Engine agent not found"));
}

#[test]
fn test_reload_without_policy_engine_reports_code() {
    let sb = Sandbox::new();
    sb.cmd().args(["deployable", "create", "shop"]).assert().success();

    let out = sb
        .cmd()
        .args(["--json", "deployable", "reload", "shop"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(3));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("valid JSON");
    assert_eq!(v["code"], "CPE_NOT_FOUND");
}

#[test]
fn test_unknown_deployable_fails_before_contacting_bus() {
    let sb = Sandbox::new();
    sb.cmd()
        .args(["deployable", "stop", "ghost"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("\"ghost\" does not exist"));
}
