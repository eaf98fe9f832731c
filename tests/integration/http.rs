//! HTTP package sources against a loopback server.

use crate::common::{Sandbox, snapshot, text};
use semver::Version;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use updraft::core::{UpdateError, find_update_error};
use updraft::models::{AppDescriptor, Credentials};
use updraft::test_utils::{PackageFixture, sha256_hex};

/// Minimal HTTP/1.1 responder: one response per connection, matched on the path suffix.
struct PackageServer {
    address: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl PackageServer {
    async fn start(archive: Option<Vec<u8>>, manifest: Option<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("http://{}/packages", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&requests);
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let archive = archive.clone();
                let manifest = manifest.clone();
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let mut head = Vec::new();
                    let mut buffer = [0u8; 1024];
                    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buffer).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => head.extend_from_slice(&buffer[..n]),
                        }
                    }
                    let head = String::from_utf8_lossy(&head).into_owned();
                    let path = head.split_whitespace().nth(1).unwrap_or_default().to_string();
                    log.lock().unwrap().push(head);

                    let body = if path.ends_with(".zip") {
                        archive
                    } else if path.ends_with(".toml") {
                        manifest.map(String::into_bytes)
                    } else {
                        None
                    };
                    let (status, body) = match body {
                        Some(body) => ("200 OK", body),
                        None => ("404 Not Found", Vec::new()),
                    };
                    let response = format!(
                        "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.write_all(&body).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self {
            address,
            requests,
        }
    }

    fn app(&self, installed: &str, latest: &str) -> AppDescriptor {
        AppDescriptor::builder("Foo", self.address.clone())
            .installed_version(Version::parse(installed).unwrap())
            .latest_version(Version::parse(latest).unwrap())
            .build()
            .unwrap()
    }
}

/// A proxy configured in the environment would swallow loopback requests.
fn proxied() -> bool {
    ["http_proxy", "HTTP_PROXY", "all_proxy", "ALL_PROXY"]
        .iter()
        .any(|name| std::env::var_os(name).is_some_and(|value| !value.is_empty()))
}

#[tokio::test]
async fn test_http_update_with_manifest_and_credentials() {
    if proxied() {
        return;
    }
    let sandbox = Sandbox::new();
    let app_dir = sandbox.install_files("Foo", &[("app.exe", "v1")]);
    let archive = PackageFixture::new().file("app.exe", "v1.1 over http").to_zip().unwrap();
    let manifest = format!("sha256 = \"{}\"\n", sha256_hex(&archive));
    let server = PackageServer::start(Some(archive), Some(manifest)).await;

    sandbox
        .engine()
        .update(&server.app("1.0.0", "1.1.0"), Some(&Credentials::new("bob", "pw", "CORP")))
        .await
        .unwrap();

    assert_eq!(text(&snapshot(&app_dir), "app.exe"), b"v1.1 over http");
    let requests = server.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].starts_with("GET /packages/1.1.0/Foo%201.1.0.zip "));
    assert!(requests[1].starts_with("GET /packages/1.1.0/Foo%201.1.0.toml "));
    assert!(requests.iter().all(|r| r.to_ascii_lowercase().contains("authorization: basic ")));
}

#[tokio::test]
async fn test_http_manifest_not_found_is_tolerated() {
    if proxied() {
        return;
    }
    let sandbox = Sandbox::new();
    let app_dir = sandbox.install_files("Foo", &[("app.exe", "v1")]);
    let archive = PackageFixture::new().file("app.exe", "v1.1").to_zip().unwrap();
    let server = PackageServer::start(Some(archive), None).await;

    sandbox.engine().update(&server.app("1.0.0", "1.1.0"), None).await.unwrap();

    assert_eq!(text(&snapshot(&app_dir), "app.exe"), b"v1.1");
}

#[tokio::test]
async fn test_http_missing_package_is_network_error() {
    if proxied() {
        return;
    }
    let sandbox = Sandbox::new();
    let app_dir = sandbox.install_files("Foo", &[("app.exe", "v1")]);
    let before = snapshot(&app_dir);
    let server = PackageServer::start(None, None).await;

    let err = sandbox.engine().update(&server.app("1.0.0", "1.1.0"), None).await.unwrap_err();

    assert!(find_update_error(&err).is_some_and(UpdateError::is_network));
    assert_eq!(snapshot(&app_dir), before);
    assert!(!sandbox.temp_dir().exists());
}
