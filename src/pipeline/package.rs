use crate::core::{MergeError, MergeResult};
use std::path::PathBuf;

/// Role of an input package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageRole {
    Base,
    /// 1-based position among the non-base inputs
    Split(usize),
}

impl PackageRole {
    /// Name of this package's directory inside the workspace
    pub fn dir_name(&self) -> String {
        match self {
            PackageRole::Base => "base".to_string(),
            PackageRole::Split(index) => format!("split_{}", index),
        }
    }
}

/// One input archive. The archive itself is only ever read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub path: PathBuf,
    pub role: PackageRole,
    /// Decompiled directory, once assigned
    pub workspace_dir: Option<PathBuf>,
}

impl Package {
    pub fn new(path: impl Into<PathBuf>, role: PackageRole) -> Self {
        Self {
            path: path.into(),
            role,
            workspace_dir: None,
        }
    }

    pub fn is_base(&self) -> bool {
        self.role == PackageRole::Base
    }
}

/// Validate inputs and assign roles: the first input is the base, the rest
/// are splits numbered from 1.
///
/// Fails on the first missing path, before anything touches the disk.
pub fn preflight(inputs: &[PathBuf]) -> MergeResult<Vec<Package>> {
    if inputs.is_empty() {
        return Err(MergeError::NoInputs);
    }

    for input in inputs {
        if !input.exists() {
            return Err(MergeError::InputNotFound(input.clone()));
        }
    }

    Ok(inputs
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let role = if i == 0 {
                PackageRole::Base
            } else {
                PackageRole::Split(i)
            };
            Package::new(path, role)
        })
        .collect())
}
