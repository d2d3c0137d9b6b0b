use crate::core::MergeResult;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Calculate the SHA-256 checksum of a file (`sha256:<hex>`)
pub fn file_checksum(path: &Path) -> MergeResult<String> {
    let data = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    let hash = hasher.finalize();
    Ok(format!("sha256:{}", hex::encode(hash)))
}

/// Whether two files have identical contents
pub fn same_contents(a: &Path, b: &Path) -> MergeResult<bool> {
    if fs::metadata(a)?.len() != fs::metadata(b)?.len() {
        return Ok(false);
    }
    Ok(file_checksum(a)? == file_checksum(b)?)
}
