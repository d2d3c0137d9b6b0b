//! Core module re-exports.
//!
//! Errors and path helpers live in `apkmerge-core`; the config file location
//! is added here because it depends on the platform config directory.

pub use apkmerge_core::core::*;

/// Path module: re-exports from apkmerge-core plus the config file location.
pub mod path;
