use crate::core::{MergeError, MergeResult};
use crate::resources::checksum::same_contents;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// What happens when a source file lands on a path that already exists in the
/// destination. The new file always wins; the policy only controls reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    /// Overwrite quietly. Overwrites are still listed in the report.
    #[default]
    Silent,
    /// Log a warning per overwritten file, noting whether contents differed
    Warn,
}

impl fmt::Display for OverwritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverwritePolicy::Silent => f.write_str("silent"),
            OverwritePolicy::Warn => f.write_str("warn"),
        }
    }
}

impl FromStr for OverwritePolicy {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "silent" => Ok(OverwritePolicy::Silent),
            "warn" => Ok(OverwritePolicy::Warn),
            other => Err(MergeError::Config(format!(
                "Unknown conflict policy '{}'. Expected 'silent' or 'warn'",
                other
            ))),
        }
    }
}

/// A destination file replaced by a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overwrite {
    /// Path relative to the destination root
    pub relative_path: PathBuf,
    /// Source root the winning file came from
    pub source_root: PathBuf,
    /// Whether old and new contents matched. Only computed under
    /// [`OverwritePolicy::Warn`].
    pub identical: Option<bool>,
}

/// What a tree merge did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeMergeReport {
    pub files_copied: usize,
    pub dirs_created: usize,
    pub overwritten: Vec<Overwrite>,
    /// Source roots that did not exist
    pub skipped: Vec<PathBuf>,
}

impl TreeMergeReport {
    pub fn absorb(&mut self, other: TreeMergeReport) {
        self.files_copied += other.files_copied;
        self.dirs_created += other.dirs_created;
        self.overwritten.extend(other.overwritten);
        self.skipped.extend(other.skipped);
    }

    /// Overwrites whose contents actually changed, when known
    pub fn changed_overwrites(&self) -> impl Iterator<Item = &Overwrite> {
        self.overwritten.iter().filter(|o| o.identical != Some(true))
    }
}

/// Overlays directory trees onto a destination: directory union, file-level
/// last-writer-wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeMerger {
    policy: OverwritePolicy,
}

impl TreeMerger {
    pub fn new(policy: OverwritePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> OverwritePolicy {
        self.policy
    }

    /// Overlay each source root onto `dest_root`, in order. Missing source
    /// roots are skipped with a warning.
    pub fn merge_trees<P: AsRef<Path>>(
        &self,
        dest_root: &Path,
        source_roots: &[P],
    ) -> MergeResult<TreeMergeReport> {
        let mut report = TreeMergeReport::default();

        for source_root in source_roots {
            let source_root = source_root.as_ref();
            if !source_root.is_dir() {
                warn!(
                    "Directory {} does not exist, skipping",
                    source_root.display()
                );
                report.skipped.push(source_root.to_path_buf());
                continue;
            }
            self.overlay(dest_root, source_root, &mut report)?;
        }

        Ok(report)
    }

    fn overlay(
        &self,
        dest_root: &Path,
        source_root: &Path,
        report: &mut TreeMergeReport,
    ) -> MergeResult<()> {
        // Created on the first entry, so an empty source leaves no trace
        let mut dest_ready = dest_root.is_dir();

        // Pre-order walk: a directory is always visited before its contents
        for entry in WalkDir::new(source_root).min_depth(1).sort_by_file_name() {
            let entry = entry?;
            if !dest_ready {
                fs::create_dir_all(dest_root)?;
                report.dirs_created += 1;
                dest_ready = true;
            }
            let relative = entry.path().strip_prefix(source_root).map_err(|e| {
                MergeError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
            })?;
            let dest = dest_root.join(relative);

            if entry.file_type().is_dir() {
                if !dest.is_dir() {
                    fs::create_dir_all(&dest)?;
                    report.dirs_created += 1;
                }
                continue;
            }

            if let Some(parent) = dest.parent() {
                if !parent.is_dir() {
                    fs::create_dir_all(parent)?;
                    report.dirs_created += 1;
                }
            }

            if dest.is_file() {
                let overwrite = self.record_overwrite(entry.path(), &dest, relative, source_root)?;
                report.overwritten.push(overwrite);
            }

            fs::copy(entry.path(), &dest)?;
            report.files_copied += 1;
        }

        debug!(
            "Merged {} into {}",
            source_root.display(),
            dest_root.display()
        );
        Ok(())
    }

    fn record_overwrite(
        &self,
        source: &Path,
        dest: &Path,
        relative: &Path,
        source_root: &Path,
    ) -> MergeResult<Overwrite> {
        let identical = match self.policy {
            OverwritePolicy::Silent => None,
            OverwritePolicy::Warn => {
                let identical = same_contents(source, dest)?;
                if identical {
                    warn!(
                        "Overwriting {} with an identical copy from {}",
                        relative.display(),
                        source_root.display()
                    );
                } else {
                    warn!(
                        "Overwriting {} with different contents from {}",
                        relative.display(),
                        source_root.display()
                    );
                }
                Some(identical)
            }
        };

        Ok(Overwrite {
            relative_path: relative.to_path_buf(),
            source_root: source_root.to_path_buf(),
            identical,
        })
    }
}

/// Overlay `source_roots` onto `dest_root` with the given overwrite policy
pub fn merge_trees<P: AsRef<Path>>(
    dest_root: &Path,
    source_roots: &[P],
    policy: OverwritePolicy,
) -> MergeResult<TreeMergeReport> {
    TreeMerger::new(policy).merge_trees(dest_root, source_roots)
}
