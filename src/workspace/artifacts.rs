use crate::core::path::remove_file_if_exists;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Files acquired for signing: the aligned archive, the `.idsig` side-file,
/// and the keystore when this run generated it.
///
/// [`SigningArtifacts::release`] deletes whichever of them exist. It runs at
/// most once; dropping an unreleased set releases it.
#[derive(Debug, Default)]
pub struct SigningArtifacts {
    paths: Vec<PathBuf>,
    released: bool,
}

impl SigningArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Delete tracked files. Returns the ones that existed and were removed.
    /// A file that cannot be removed is reported and skipped.
    pub fn release(&mut self) -> Vec<PathBuf> {
        if self.released {
            return Vec::new();
        }
        self.released = true;

        let mut removed = Vec::new();
        for path in &self.paths {
            match remove_file_if_exists(path) {
                Ok(true) => {
                    debug!("Removed {}", path.display());
                    removed.push(path.clone());
                }
                Ok(false) => {}
                Err(e) => warn!("Could not remove {}: {}", path.display(), e),
            }
        }
        removed
    }
}

impl Drop for SigningArtifacts {
    fn drop(&mut self) {
        self.release();
    }
}
