//! Core types for apkmerge.
//!
//! Holds the error model shared by the pipeline and its collaborators, and
//! the AndroidManifest document model and merger.

// Core functionality
pub mod core;

// AndroidManifest model and merger
pub mod manifest;

// Re-export commonly used types
pub use core::{format_error_with_help, ErrorHelp, MergeError, MergeResult, Stage, ToolError};
pub use manifest::{merge_manifests, DedupPolicy, ManifestDocument, MergedManifest};
