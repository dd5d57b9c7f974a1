mod common;

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use common::write_script;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_malformed_rows_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("robustness.csv");
    write_script(
        &script,
        &[
            &["item", "lamp", "Desk lamp", "19.99", "1|1"],
            // Unknown event
            &["teleport", "mars"],
            // Price is not a number
            &["item", "bulb", "Bulb", "cheap", "1|1"],
            // Quantity/MOQ pair without separator
            &["item", "bulb", "Bulb", "3.50", "4"],
            &["item", "bulb", "Bulb", "3.50", "4|1"],
        ],
    )
    .unwrap();

    let mut cmd = Command::new(cargo_bin!("checkout-flow"));
    cmd.arg(&script);

    let output = cmd
        .assert()
        .success()
        .stderr(predicate::str::contains("Error reading event"))
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["cart"].as_array().unwrap().len(), 2);
    assert!(report["checkout"].is_null());
}

#[test]
fn test_rejected_actions_do_not_stop_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("rejected.csv");
    write_script(
        &script,
        &[
            &["item", "lamp", "Desk lamp", "19.99", "1|1"],
            &["confirm"],
            &["shipping", "Ada", "", "London", "N1|GB"],
            &["shipping", "Ada", "1 Main St", "London", "N1|GB"],
            &["payment", "Ada", "4111 1111", "1", "2031"],
            &["payment", "Ada", "4111 1111 1111 1111", "1", "2031"],
            &["code", "000"],
            &["wait", "61"],
            &["code", "123456"],
            &["resend"],
            &["code", "123456"],
        ],
    )
    .unwrap();

    let mut cmd = Command::new(cargo_bin!("checkout-flow"));
    cmd.arg(&script);

    let output = cmd
        .assert()
        .success()
        .stderr(predicate::str::contains("Cannot confirm the order while at the shipping step"))
        .stderr(predicate::str::contains("Missing shipping fields: street"))
        .stderr(predicate::str::contains("Verification code expired"))
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["checkout"]["step"], "review");
    assert!(report["receipt"].is_null());
}

#[test]
fn test_single_attempt_policy_with_shape_only_verifier() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("checkout.toml");
    std::fs::write(&config, "[otp]\nmax_attempts = 1\n").unwrap();
    let script = dir.path().join("blocked.csv");
    write_script(
        &script,
        &[
            &["shipping", "Ada", "1 Main St", "London", "N1|GB"],
            &["payment", "Ada", "5555 5555 5555 4444", "1", "2031"],
            &["code", "123456"],
        ],
    )
    .unwrap();

    let mut cmd = Command::new(cargo_bin!("checkout-flow"));
    cmd.arg(&script).arg("--config").arg(&config);
    let output = cmd.assert().success().get_output().stdout.clone();

    // The shape-only verifier accepts, so one attempt is enough.
    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["checkout"]["step"], "review");
    assert_eq!(report["checkout"]["blocked"], false);
    assert_eq!(report["checkout"]["payment"]["brand"], "Mastercard");
}
