//! External collaborators: the command-line tools the pipeline delegates to.
//!
//! [`PackageTools`] is the seam the pipeline depends on. [`AndroidTools`]
//! implements it with apktool, zipalign, keytool and apksigner, invoked
//! through a [`ToolRunner`].

pub mod android;
pub mod runner;

pub use android::AndroidTools;
pub use runner::{ProcessRunner, ToolOutput, ToolRunner};

use crate::core::ToolError;
use std::path::Path;

/// Decompile, rebuild, align and sign APKs
pub trait PackageTools {
    /// Decode `archive` into `output_dir`
    fn decompile(&self, archive: &Path, output_dir: &Path) -> Result<(), ToolError>;

    /// Build `workspace_dir` into `output_archive`
    fn recompile(&self, workspace_dir: &Path, output_archive: &Path) -> Result<(), ToolError>;

    fn align(&self, input: &Path, output: &Path) -> Result<(), ToolError>;

    /// Create a signing keystore at `credential`. Does nothing if it exists.
    fn generate_credential(&self, credential: &Path) -> Result<(), ToolError>;

    fn sign(&self, credential: &Path, input: &Path, output: &Path) -> Result<(), ToolError>;
}
