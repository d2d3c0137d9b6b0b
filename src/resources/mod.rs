//! Overlaying decompiled split trees (`res`, `lib`, `assets`) onto the base.

pub mod checksum;
pub mod tree_merger;

pub use tree_merger::{merge_trees, Overwrite, OverwritePolicy, TreeMergeReport, TreeMerger};
