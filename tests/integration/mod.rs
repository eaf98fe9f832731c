//! Integration test suite for updraft
//!
//! End-to-end tests through the public API and the updater binary. Package sources are
//! `file://` directories, plus one loopback HTTP server, so no network is needed.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **engine**: install and update transactions, rollback, checksum gate
//! - **handoff**: argument round trip and the updater side of the handoff
//! - **http**: HTTP package sources, credentials, missing manifests
//! - **cli**: the `updraft-updater` binary

#[path = "../common/mod.rs"]
mod common;

mod cli;
mod engine;
mod handoff;
mod http;
