//! File system operations on install directories.
//!
//! - [`suffix`]: rename and delete primitives that stage an update in place
//! - [`extract`]: zip package extraction that never overwrites
//! - [`dirs`]: directory creation and removal helpers
//!
//! All operations are synchronous. Failures carry [`crate::core::UpdateError::IoTransfer`]
//! with the failing path.
//!
//! # Examples
//!
//! ```rust,no_run
//! use updraft::models::IgnoredDirectories;
//! use updraft::utils::fs::{Depth, add_suffix_to_all, remove_suffix_from_all};
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let dir = Path::new("apps/Foo");
//! let ignored: IgnoredDirectories = ["cache"].into_iter().collect();
//! add_suffix_to_all(dir, "_old", Depth::TopLevel, &ignored)?;
//! remove_suffix_from_all(dir, "_old", Depth::TopLevel, &ignored)?;
//! # Ok(())
//! # }
//! ```

pub mod dirs;
pub mod extract;
pub mod suffix;

pub use dirs::{ensure_dir, list_entries, remove_dir_all, remove_entries_except};
pub use extract::extract_zip;
pub use suffix::{
    Depth, add_suffix_to_all, delete_all_with_suffix, delete_all_without_suffix, has_suffix,
    remove_suffix_from_all,
};
