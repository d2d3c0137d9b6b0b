use crate::core::path::ensure_dir;
use crate::core::MergeResult;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempDir};
use tracing::debug;

/// Prefix of the top-level temporary directory created for each run
pub const WORKSPACE_PREFIX: &str = ".apkmerge-";

/// Arena for the decompiled packages of one run.
///
/// The root is a uniquely named directory, so it never collides with user
/// files or with another run's workspace. Package directories are handed out
/// by [`Workspace::allocate`] and removed together by [`Workspace::teardown`].
/// Dropping an arena that was never torn down removes it as well.
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    root: PathBuf,
    allocated: Vec<PathBuf>,
}

impl Workspace {
    /// Create a fresh workspace root inside `parent`
    pub fn create_in(parent: &Path) -> MergeResult<Self> {
        ensure_dir(parent)?;
        let dir = Builder::new().prefix(WORKSPACE_PREFIX).tempdir_in(parent)?;
        let root = dir.path().to_path_buf();
        debug!("Created workspace {}", root.display());

        Ok(Self {
            dir: Some(dir),
            root,
            allocated: Vec::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reserve `<root>/<name>` for a package. The directory itself is created
    /// by whoever fills it (the decompiler).
    pub fn allocate(&mut self, name: &str) -> PathBuf {
        let path = self.root.join(name);
        if !self.allocated.contains(&path) {
            self.allocated.push(path.clone());
        }
        path
    }

    pub fn allocated(&self) -> &[PathBuf] {
        &self.allocated
    }

    pub fn is_released(&self) -> bool {
        self.dir.is_none()
    }

    /// Remove every allocated directory and the root. Later calls do nothing.
    pub fn teardown(&mut self) -> MergeResult<()> {
        let Some(dir) = self.dir.take() else {
            return Ok(());
        };

        for path in self.allocated.drain(..).rev() {
            if path.exists() {
                fs::remove_dir_all(&path)?;
                debug!("Removed {}", path.display());
            }
        }
        dir.close()?;
        debug!("Removed workspace {}", self.root.display());
        Ok(())
    }
}
