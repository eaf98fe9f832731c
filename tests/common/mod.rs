//! Common helpers for the updraft integration tests.
//!
//! Every test gets its own sandbox: a root directory of installed applications and a
//! `file://` package source next to it.

// Not every helper is used by every test module.
#![allow(dead_code)]

use semver::Version;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use updraft::constants::BACKUP_SUFFIX;
use updraft::layout::Layout;
use updraft::models::AppDescriptor;
use updraft::test_utils::{PackageSource, init_test_logging};
use updraft::upgrade::{EngineConfig, UpdateEngine};
use walkdir::WalkDir;

/// Root directory plus package source in one temp directory.
pub struct Sandbox {
    _temp: TempDir,
    pub root: PathBuf,
    pub source: PackageSource,
}

impl Sandbox {
    pub fn new() -> Self {
        init_test_logging(None);
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("apps");
        fs::create_dir_all(&root).unwrap();
        let source = PackageSource::new(&temp.path().join("server")).unwrap();
        Self {
            _temp: temp,
            root,
            source,
        }
    }

    pub fn engine(&self) -> UpdateEngine {
        self.engine_with(EngineConfig::default())
    }

    pub fn engine_with(&self, config: EngineConfig) -> UpdateEngine {
        UpdateEngine::new(Layout::new(&self.root), config).unwrap()
    }

    /// Descriptor of `name` served by this sandbox's source.
    pub fn app(&self, name: &str, installed: Option<&str>, latest: &str) -> AppDescriptor {
        self.app_ignoring(name, installed, latest, &[])
    }

    pub fn app_ignoring(
        &self,
        name: &str,
        installed: Option<&str>,
        latest: &str,
        ignored: &[&str],
    ) -> AppDescriptor {
        let mut builder = AppDescriptor::builder(name, self.source.address().unwrap())
            .latest_version(Version::parse(latest).unwrap())
            .ignored_directories(ignored.iter().copied());
        if let Some(installed) = installed {
            builder = builder.installed_version(Version::parse(installed).unwrap());
        }
        builder.build().unwrap()
    }

    /// Create `root/<dir>` with the given files.
    pub fn install_files(&self, dir: &str, files: &[(&str, &str)]) -> PathBuf {
        let app_dir = self.root.join(dir);
        for (name, content) in files {
            let path = app_dir.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        app_dir
    }

    pub fn temp_dir(&self) -> PathBuf {
        Layout::new(&self.root).temp_dir()
    }
}

/// Relative path to content for every entry under `dir`; directories map to nothing.
pub fn snapshot(dir: &Path) -> BTreeMap<String, Option<Vec<u8>>> {
    WalkDir::new(dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .map(|entry| entry.unwrap())
        .map(|entry| {
            let relative =
                entry.path().strip_prefix(dir).unwrap().to_string_lossy().replace('\\', "/");
            let content = entry.file_type().is_file().then(|| fs::read(entry.path()).unwrap());
            (relative, content)
        })
        .collect()
}

/// Number of entries anywhere under `dir` carrying the backup suffix.
pub fn backup_entries(dir: &Path) -> usize {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(BACKUP_SUFFIX))
        .count()
}

/// File content from a snapshot.
pub fn text<'a>(files: &'a BTreeMap<String, Option<Vec<u8>>>, name: &str) -> &'a [u8] {
    files.get(name).and_then(Option::as_deref).unwrap_or_else(|| panic!("no file '{name}'"))
}
