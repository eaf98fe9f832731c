//! Install and update transactions end to end.

use crate::common::{Sandbox, backup_entries, snapshot, text};
use std::fs;
use updraft::core::{UpdateError, find_update_error};
use updraft::test_utils::PackageFixture;
use updraft::upgrade::EngineConfig;

#[tokio::test]
async fn test_install_new_application() {
    let sandbox = Sandbox::new();
    let archive = PackageFixture::new()
        .file("Foo", "foo 1.2.0")
        .dir("data")
        .file("data/defaults.ini", "[defaults]")
        .to_zip()
        .unwrap();
    sandbox.source.publish_verified("Foo", "1.2.0", &archive).unwrap();

    let target = sandbox.engine().install(&sandbox.app("Foo", None, "1.2.0"), None).await.unwrap();

    assert_eq!(target, sandbox.root.join("Foo"));
    let files = snapshot(&target);
    assert_eq!(files.keys().collect::<Vec<_>>(), ["Foo", "data", "data/defaults.ini"]);
    assert_eq!(text(&files, "Foo"), b"foo 1.2.0");
    assert_eq!(text(&files, "data/defaults.ini"), b"[defaults]");
    assert!(!sandbox.temp_dir().exists());
}

#[tokio::test]
async fn test_corrupted_update_leaves_directory_unchanged() {
    let sandbox = Sandbox::new();
    let app_dir =
        sandbox.install_files("Foo", &[("config.ini", "v1"), ("app.exe", "v1 bytes")]);
    let before = snapshot(&app_dir);
    let archive = PackageFixture::new()
        .file("app.exe", "v1.1 bytes")
        .file("config.ini", "v1.1")
        .file("readme.txt", "extraction breaks here")
        .to_corrupted_zip()
        .unwrap();
    sandbox.source.publish("Foo", "1.1.0", &archive).unwrap();

    let err = sandbox
        .engine()
        .update(&sandbox.app("Foo", Some("1.0.0"), "1.1.0"), None)
        .await
        .unwrap_err();

    assert!(matches!(find_update_error(&err), Some(UpdateError::IoTransfer { .. })));
    assert!(err.chain().count() > 2, "extraction cause must stay in the chain");
    assert_eq!(snapshot(&app_dir), before);
    assert_eq!(backup_entries(&app_dir), 0);
    assert!(!sandbox.temp_dir().exists());
}

#[tokio::test]
async fn test_commit_replaces_everything_but_ignored_entries() {
    let sandbox = Sandbox::new();
    let app_dir = sandbox.install_files(
        "Foo",
        &[("a.txt", "old a"), ("b.txt", "user b"), ("old.dll", "gone"), ("cache/x", "kept")],
    );
    let archive = PackageFixture::new()
        .file("a.txt", "new a")
        .file("b.txt", "packaged b")
        .file("cache/y", "packaged cache")
        .file("new.dll", "added")
        .to_zip()
        .unwrap();
    sandbox.source.publish_verified("Foo", "1.1.0", &archive).unwrap();
    let app = sandbox.app_ignoring("Foo", Some("1.0.0"), "1.1.0", &["b.txt", "cache"]);

    sandbox.engine().update(&app, None).await.unwrap();

    let files = snapshot(&app_dir);
    assert_eq!(text(&files, "a.txt"), b"new a");
    assert_eq!(text(&files, "new.dll"), b"added");
    assert_eq!(text(&files, "b.txt"), b"user b");
    assert_eq!(text(&files, "cache/x"), b"kept");
    assert!(!files.contains_key("cache/y"));
    assert!(!files.contains_key("old.dll"));
    assert_eq!(backup_entries(&app_dir), 0);
}

#[tokio::test]
async fn test_rollback_keeps_ignored_entries() {
    let sandbox = Sandbox::new();
    let app_dir = sandbox.install_files("Foo", &[("a.txt", "old a"), ("b.txt", "user b")]);
    let before = snapshot(&app_dir);
    let archive = PackageFixture::new()
        .file("a.txt", "new a")
        .file("c.txt", "broken tail")
        .to_corrupted_zip()
        .unwrap();
    sandbox.source.publish("Foo", "1.1.0", &archive).unwrap();
    let app = sandbox.app_ignoring("Foo", Some("1.0.0"), "1.1.0", &["b.txt"]);

    sandbox.engine().update(&app, None).await.unwrap_err();

    assert_eq!(snapshot(&app_dir), before);
}

#[tokio::test]
async fn test_checksum_gate() {
    let sandbox = Sandbox::new();
    let app_dir = sandbox.install_files("Foo", &[("app.exe", "v1")]);
    let before = snapshot(&app_dir);
    let archive = PackageFixture::new().file("app.exe", "v1.1").to_zip().unwrap();
    let other = PackageFixture::new().file("app.exe", "something else").to_zip().unwrap();
    sandbox.source.publish_verified("Foo", "1.1.0", &other).unwrap();
    sandbox.source.publish("Foo", "1.1.0", &archive).unwrap();

    let err = sandbox
        .engine()
        .update(&sandbox.app("Foo", Some("1.0.0"), "1.1.0"), None)
        .await
        .unwrap_err();

    assert!(matches!(find_update_error(&err), Some(UpdateError::ChecksumMismatch { .. })));
    assert_eq!(snapshot(&app_dir), before);
    assert!(!sandbox.temp_dir().exists());
}

#[tokio::test]
async fn test_missing_manifest_is_tolerated() {
    let sandbox = Sandbox::new();
    let app_dir = sandbox.install_files("Foo", &[("app.exe", "v1")]);
    let archive = PackageFixture::new().file("app.exe", "v1.1").to_zip().unwrap();
    sandbox.source.publish("Foo", "1.1.0", &archive).unwrap();

    sandbox.engine().update(&sandbox.app("Foo", Some("1.0.0"), "1.1.0"), None).await.unwrap();

    assert_eq!(fs::read_to_string(app_dir.join("app.exe")).unwrap(), "v1.1");
}

#[tokio::test]
async fn test_disabled_verification_skips_manifest() {
    let sandbox = Sandbox::new();
    sandbox.install_files("Foo", &[("app.exe", "v1")]);
    let archive = PackageFixture::new().file("app.exe", "v1.1").to_zip().unwrap();
    sandbox.source.publish("Foo", "1.1.0", &archive).unwrap();
    sandbox.source.publish_manifest("Foo", "1.1.0", &"0".repeat(64)).unwrap();
    let engine = sandbox.engine_with(EngineConfig {
        verify_checksum: false,
        ..EngineConfig::default()
    });

    engine.update(&sandbox.app("Foo", Some("1.0.0"), "1.1.0"), None).await.unwrap();
}

#[tokio::test]
async fn test_interrupted_update_residue_is_purged() {
    let sandbox = Sandbox::new();
    let app_dir = sandbox.install_files(
        "Foo",
        &[("app.exe", "v1"), ("app.exe_UDbackup", "v0 left behind"), ("lib_UDbackup/x", "v0")],
    );
    let archive = PackageFixture::new().file("app.exe", "v1.1").to_zip().unwrap();
    sandbox.source.publish_verified("Foo", "1.1.0", &archive).unwrap();

    sandbox.engine().update(&sandbox.app("Foo", Some("1.0.0"), "1.1.0"), None).await.unwrap();

    let files = snapshot(&app_dir);
    assert_eq!(files.keys().collect::<Vec<_>>(), ["app.exe"]);
    assert_eq!(text(&files, "app.exe"), b"v1.1");
}

#[tokio::test]
async fn test_directory_name_differs_from_application_name() {
    let sandbox = Sandbox::new();
    let archive = PackageFixture::new().file("Foo", "binary").to_zip().unwrap();
    sandbox.source.publish_verified("Foo", "2.0.0", &archive).unwrap();
    let app = updraft::models::AppDescriptor::builder("Foo", sandbox.source.address().unwrap())
        .latest_version(semver::Version::new(2, 0, 0))
        .directory_path("Foo Suite")
        .build()
        .unwrap();

    let target = sandbox.engine().install(&app, None).await.unwrap();

    assert_eq!(target, sandbox.root.join("Foo Suite"));
    assert!(target.join("Foo").is_file());
}

#[tokio::test]
async fn test_failed_install_into_existing_directory_keeps_its_files() {
    let sandbox = Sandbox::new();
    let app_dir =
        sandbox.install_files("Foo", &[("user-notes.txt", "mine"), ("data/prefs.ini", "mine")]);
    let before = snapshot(&app_dir);
    let archive = PackageFixture::new()
        .file("Foo", "binary")
        .file("data/defaults.ini", "[defaults]")
        .file("readme.txt", "extraction breaks here")
        .to_corrupted_zip()
        .unwrap();
    sandbox.source.publish("Foo", "1.2.0", &archive).unwrap();

    let err = sandbox.engine().install(&sandbox.app("Foo", None, "1.2.0"), None).await.unwrap_err();

    assert!(matches!(find_update_error(&err), Some(UpdateError::IoTransfer { .. })));
    assert_eq!(snapshot(&app_dir), before);
    assert!(!sandbox.temp_dir().exists());
}

#[tokio::test]
async fn test_failed_install_removes_created_directory() {
    let sandbox = Sandbox::new();
    let archive = PackageFixture::new()
        .file("Foo", "binary")
        .file("readme.txt", "extraction breaks here")
        .to_corrupted_zip()
        .unwrap();
    sandbox.source.publish("Foo", "1.2.0", &archive).unwrap();

    sandbox.engine().install(&sandbox.app("Foo", None, "1.2.0"), None).await.unwrap_err();

    assert!(!sandbox.root.join("Foo").exists());
}
