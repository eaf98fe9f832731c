//! The `updraft-updater` binary.

use crate::common::{Sandbox, snapshot, text};
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use updraft::constants::{CRATE_VERSION, NO_PROGRESS_ENV_VAR};
use updraft::handoff::{ArgumentCodec, HandoffRequest};
use updraft::models::UpdaterBehavior;
use updraft::test_utils::PackageFixture;

fn updater(sandbox: &Sandbox) -> Command {
    let mut cmd = Command::cargo_bin("updraft-updater").unwrap();
    cmd.env(NO_PROGRESS_ENV_VAR, "1")
        .env_remove("RUST_LOG")
        .arg("--root")
        .arg(&sandbox.root)
        .arg("--config")
        .arg(sandbox.root.join("no-config.toml"));
    cmd
}

fn handoff_args(sandbox: &Sandbox, behavior: UpdaterBehavior) -> Vec<String> {
    ArgumentCodec::encode(&HandoffRequest {
        app: sandbox.app("Foo", Some("1.0.0"), "1.1.0"),
        behavior,
        credentials: None,
        relaunch_args: String::new(),
    })
    .unwrap()
}

fn publish_update(sandbox: &Sandbox) {
    let archive = PackageFixture::new().file("app.exe", "v1.1").to_zip().unwrap();
    sandbox.source.publish_verified("Foo", "1.1.0", &archive).unwrap();
}

#[test]
fn test_version() {
    Command::cargo_bin("updraft-updater")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("updraft-updater {CRATE_VERSION}")));
}

#[test]
fn test_wrong_argument_count_fails() {
    let sandbox = Sandbox::new();

    updater(&sandbox)
        .args(["Foo", "1.1.0", "Foo"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Expected 6, 7, 9 or 10 handoff arguments, got 3"));
}

#[test]
fn test_unknown_behavior_fails() {
    let sandbox = Sandbox::new();

    updater(&sandbox)
        .args(["Foo", "1.1.0", "Foo", "file:///srv", "{}", "LOUD"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown updater behavior 'LOUD'"));
}

#[test]
fn test_show_messages_update() {
    let sandbox = Sandbox::new();
    let app_dir = sandbox.install_files("Foo", &[("app.exe", "v1")]);
    publish_update(&sandbox);

    updater(&sandbox)
        .args(handoff_args(&sandbox, UpdaterBehavior::ShowMessages))
        .assert()
        .success()
        .stdout(predicate::str::contains("Foo was successfully updated!"));

    assert_eq!(text(&snapshot(&app_dir), "app.exe"), b"v1.1");
    assert!(!sandbox.temp_dir().exists());
}

#[test]
fn test_hidden_update_prints_nothing() {
    let sandbox = Sandbox::new();
    sandbox.install_files("Foo", &[("app.exe", "v1")]);
    publish_update(&sandbox);

    updater(&sandbox)
        .arg("--quiet")
        .args(handoff_args(&sandbox, UpdaterBehavior::Hidden))
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_failed_update_exits_with_one() {
    let sandbox = Sandbox::new();
    let app_dir = sandbox.install_files("Foo", &[("app.exe", "v1")]);
    let before = snapshot(&app_dir);

    updater(&sandbox)
        .args(handoff_args(&sandbox, UpdaterBehavior::ShowMessages))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("internet connection while updating Foo"));

    assert_eq!(snapshot(&app_dir), before);
}

#[test]
fn test_root_from_config_file() {
    let sandbox = Sandbox::new();
    let app_dir = sandbox.install_files("Foo", &[("app.exe", "v1")]);
    publish_update(&sandbox);
    let config = sandbox.root.parent().unwrap().join("config.toml");
    write_config(&config, &sandbox.root);

    Command::cargo_bin("updraft-updater")
        .unwrap()
        .env(NO_PROGRESS_ENV_VAR, "1")
        .arg("--config")
        .arg(&config)
        .args(handoff_args(&sandbox, UpdaterBehavior::Hidden))
        .assert()
        .success();

    assert_eq!(text(&snapshot(&app_dir), "app.exe"), b"v1.1");
}

fn write_config(path: &Path, root: &Path) {
    let root = root.to_string_lossy().replace('\\', "\\\\");
    std::fs::write(path, format!("root = \"{root}\"\n\n[engine]\nshow_progress = false\n")).unwrap();
}
