//! The handoff protocol and the updater side of it.

use crate::common::{Sandbox, snapshot, text};
use semver::Version;
use std::sync::Mutex;
use updraft::core::UpdateError;
use updraft::handoff::{ArgumentCodec, HandoffRequest, Updater, UpdaterUi};
use updraft::models::{AppDescriptor, Credentials, UpdaterBehavior};
use updraft::test_utils::PackageFixture;
use updraft::upgrade::UpdateObserver;

#[derive(Default)]
struct Messages(Mutex<Vec<String>>);

impl UpdateObserver for Messages {}

impl UpdaterUi for Messages {
    fn show_success(&self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }

    fn show_error(&self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
}

#[test]
fn test_round_trip_preserves_descriptor_and_behavior() {
    let app = AppDescriptor::builder("Bar", "https://example.test")
        .latest_version(Version::new(2, 0, 0))
        .directory_path("Bar")
        .ignored_directories(["cache", "logs"])
        .build()
        .unwrap();
    let request = HandoffRequest {
        app: app.clone(),
        behavior: UpdaterBehavior::RunAfterUpdate,
        credentials: None,
        relaunch_args: String::new(),
    };

    let args = ArgumentCodec::encode(&request).unwrap();
    let decoded = ArgumentCodec::decode(&args).unwrap();

    assert_eq!(decoded.app, app);
    assert_eq!(decoded.behavior, UpdaterBehavior::RunAfterUpdate);
    assert_eq!(decoded.credentials, None);
    assert_eq!(decoded, request);
}

#[test]
fn test_wire_format_is_stable() {
    let app = AppDescriptor::builder("My App", "https://example.test/my app")
        .latest_version(Version::new(1, 0, 3))
        .ignored_directories(["user data"])
        .build()
        .unwrap();
    let request = HandoffRequest {
        app,
        behavior: UpdaterBehavior::ShowMessages,
        credentials: Some(Credentials::new("bob", "p w", "CORP")),
        relaunch_args: "--open file.txt".to_string(),
    };

    let args = ArgumentCodec::encode(&request).unwrap();

    assert_eq!(
        args,
        [
            "My%20App",
            "1.0.3",
            "My%20App",
            "https://example.test/my%20app",
            "{user%20data}",
            "SHOW_MESSAGES",
            "{bob}",
            "{p%20w}",
            "{CORP}",
            "--open%20file.txt",
        ]
    );
}

#[test]
fn test_updater_name_cannot_be_decoded() {
    let args = ["Updater", "1.0.0", "Updater", "file:///srv", "{}", "HIDDEN"];

    let err = ArgumentCodec::decode(&args).unwrap_err();

    assert!(matches!(err.downcast_ref::<UpdateError>(), Some(UpdateError::ReservedName { .. })));
}

#[tokio::test]
async fn test_updater_applies_encoded_request() {
    let sandbox = Sandbox::new();
    let app_dir = sandbox.install_files("Bar", &[("bar.bin", "2.0"), ("logs/today.log", "keep")]);
    let archive = PackageFixture::new().file("bar.bin", "2.1").to_zip().unwrap();
    sandbox.source.publish_verified("Bar", "2.1.0", &archive).unwrap();
    let request = HandoffRequest {
        app: sandbox.app_ignoring("Bar", Some("2.0.0"), "2.1.0", &["logs"]),
        behavior: UpdaterBehavior::ShowMessages,
        credentials: None,
        relaunch_args: String::new(),
    };
    let args = ArgumentCodec::encode(&request).unwrap();
    let engine = sandbox.engine();
    let ui = Messages::default();

    let outcome = Updater::new(&engine, &ui).run(&args).await.unwrap();

    assert_eq!(outcome.directory, app_dir);
    assert_eq!(outcome.relaunched, None);
    let files = snapshot(&app_dir);
    assert_eq!(text(&files, "bar.bin"), b"2.1");
    assert_eq!(text(&files, "logs/today.log"), b"keep");
    assert_eq!(*ui.0.lock().unwrap(), ["Bar was successfully updated!"]);
}

#[tokio::test]
async fn test_updater_reports_failure_chain() {
    let sandbox = Sandbox::new();
    sandbox.install_files("Bar", &[("bar.bin", "2.0")]);
    let archive = PackageFixture::new().file("bar.bin", "2.1").to_zip().unwrap();
    sandbox.source.publish("Bar", "2.1.0", &archive).unwrap();
    sandbox.source.publish_manifest("Bar", "2.1.0", &"f".repeat(64)).unwrap();
    let request = HandoffRequest {
        app: sandbox.app("Bar", Some("2.0.0"), "2.1.0"),
        behavior: UpdaterBehavior::ShowMessages,
        credentials: None,
        relaunch_args: String::new(),
    };
    let engine = sandbox.engine();
    let ui = Messages::default();

    Updater::new(&engine, &ui).execute(request).await.unwrap_err();

    let messages = ui.0.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("Bar could not be updated."));
    assert!(messages[0].contains("Checksum mismatch"));
}

#[tokio::test]
async fn test_updater_refuses_directory_outside_root() {
    let sandbox = Sandbox::new();
    let outside = sandbox.root.parent().unwrap().join("victim");
    std::fs::create_dir_all(&outside).unwrap();
    std::fs::write(outside.join("important.doc"), "keep").unwrap();
    let archive = PackageFixture::new().file("Foo", "binary").to_zip().unwrap();
    sandbox.source.publish_verified("Foo", "1.1.0", &archive).unwrap();
    let address = sandbox.source.address().unwrap();
    let engine = sandbox.engine();
    let ui = Messages::default();

    for directory in ["../victim".to_string(), outside.to_string_lossy().replace(' ', "%20")] {
        let args = ["Foo", "1.1.0", directory.as_str(), address.as_str(), "{}", "HIDDEN"];
        let err = Updater::new(&engine, &ui).run(&args).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<UpdateError>(), Some(UpdateError::Validation { .. })));
    }

    assert_eq!(std::fs::read_to_string(outside.join("important.doc")).unwrap(), "keep");
}
