use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn top_level_help_lists_commands() {
    let mut cmd = cargo_bin_cmd!("ecoscanctl");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("scan"))
        .stdout(predicate::str::contains("history"))
        .stdout(predicate::str::contains("--base-url"));
}

#[test]
fn scan_help_mentions_crop_and_camera_options() {
    let mut cmd = cargo_bin_cmd!("ecoscanctl");
    let output = cmd
        .arg("scan")
        .arg("--help")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8_lossy(&output);
    assert!(text.contains("--crop"), "scan help missing --crop");
    assert!(text.contains("--display"), "scan help missing --display");
    assert!(text.contains("--zoom"), "scan help missing --zoom");
    assert!(
        text.contains("--camera-snapshot"),
        "scan help missing --camera-snapshot"
    );
}

#[test]
fn profile_and_history_subcommands_present() {
    let mut cmd = cargo_bin_cmd!("ecoscanctl");
    cmd.args(["profile", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("update"));

    let mut cmd = cargo_bin_cmd!("ecoscanctl");
    cmd.args(["history", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("clear"));
}

#[test]
fn scan_without_image_is_a_usage_error() {
    let mut cmd = cargo_bin_cmd!("ecoscanctl");
    cmd.arg("scan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("IMAGE"));
}
