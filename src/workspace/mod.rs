//! Lifetime management for everything a run creates on disk.
//!
//! [`Workspace`] owns the top-level temporary directory holding the
//! decompiled packages. [`SigningArtifacts`] owns the aligned archive,
//! signature side-file and generated keystore. Both release their contents
//! exactly once, on an explicit call or on drop.

pub mod artifacts;
pub mod arena;

pub use arena::Workspace;
pub use artifacts::SigningArtifacts;
