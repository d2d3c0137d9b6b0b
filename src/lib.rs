//! apkmerge: merge a base APK and its split APKs into one standalone APK.
//!
//! The manifest model and merger live in `apkmerge-core`; this crate adds the
//! resource tree merger, the workspace lifecycle, the external tool
//! collaborators and the pipeline that sequences them.

pub use apkmerge_core::{format_error_with_help, ErrorHelp, MergeError, MergeResult, Stage, ToolError};
pub use apkmerge_core::manifest;

/// Core module re-exported from apkmerge-core.
pub mod core;

/// Configuration management.
pub mod config;

/// Resource, native library and asset tree merging.
pub mod resources;

/// Temporary workspace and signing artifact lifetimes.
pub mod workspace;

/// External tool collaborators.
pub mod tools;

/// Merge pipeline.
pub mod pipeline;
