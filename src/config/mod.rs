//! Configuration for updraft.
//!
//! A single optional TOML file holds the root directory override, the address updater
//! packages come from and the engine settings. See [`GlobalConfig`] for the format and
//! the lookup order.

mod global;

pub use global::GlobalConfig;
