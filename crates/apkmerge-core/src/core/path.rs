use crate::core::error::MergeResult;
use std::path::{Path, PathBuf};

/// File name of the manifest inside a decompiled package
pub const MANIFEST_FILE: &str = "AndroidManifest.xml";

/// Directories overlaid from each split onto the base workspace, in merge order
pub const MERGED_ROOTS: [&str; 3] = ["res", "lib", "assets"];

/// Get the manifest path of a decompiled package directory
pub fn manifest_path(package_dir: &Path) -> PathBuf {
    package_dir.join(MANIFEST_FILE)
}

/// Path of the aligned intermediate artifact derived from the output path
///
/// `out/combined.apk` becomes `out/combined-align.apk`.
pub fn aligned_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output.with_file_name(format!("{}-align.apk", stem))
}

/// Path of the v4 signature side-file apksigner writes next to its output
pub fn idsig_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".idsig");
    PathBuf::from(name)
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> MergeResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Remove a file if it exists. Returns whether anything was removed.
pub fn remove_file_if_exists(path: &Path) -> MergeResult<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
