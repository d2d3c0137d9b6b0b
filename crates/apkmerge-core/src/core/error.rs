use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type MergeResult<T> = Result<T, MergeError>;

/// Pipeline stage, used to tag failures and narrate progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    DecompileBase,
    DecompileSplits,
    MergeManifest,
    MergeResources,
    Recompile,
    CleanupWorkspace,
    Align,
    GenerateCredential,
    Sign,
    CleanupArtifacts,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::DecompileBase => "decompile base",
            Stage::DecompileSplits => "decompile splits",
            Stage::MergeManifest => "merge manifest",
            Stage::MergeResources => "merge resources",
            Stage::Recompile => "recompile",
            Stage::CleanupWorkspace => "cleanup workspace",
            Stage::Align => "align",
            Stage::GenerateCredential => "generate keystore",
            Stage::Sign => "sign",
            Stage::CleanupArtifacts => "cleanup artifacts",
        };
        f.write_str(name)
    }
}

/// An external tool could not be launched or exited unsuccessfully.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ToolError {
    /// Program name as invoked (e.g. `apktool`).
    pub tool: String,
    /// `None` when the process never ran or was killed by a signal.
    pub exit_code: Option<i32>,
    /// Captured stderr, or the launch failure message.
    pub stderr: String,
}

impl ToolError {
    pub fn new(tool: impl Into<String>, exit_code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }

    /// The tool was not found on PATH or could not be spawned.
    pub fn launch(tool: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::new(tool, None, format!("failed to launch: {}", reason))
    }

    pub fn is_launch_failure(&self) -> bool {
        self.exit_code.is_none() && self.stderr.starts_with("failed to launch")
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => write!(f, "{} exited with code {}", self.tool, code)?,
            None => write!(f, "{} did not complete", self.tool)?,
        }
        let detail = self.stderr.trim();
        if !detail.is_empty() {
            write!(f, ": {}", detail)?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("No input packages given")]
    NoInputs,

    #[error("Input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Manifest structure error: {0}")]
    Structure(String),

    #[error("Stage '{stage}' failed: {source}")]
    Tool {
        stage: Stage,
        #[source]
        source: ToolError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to write manifest: {0}")]
    Serialize(String),

    #[error("WalkDir error: {0}")]
    WalkDir(#[from] walkdir::Error),
}

impl MergeError {
    pub fn tool(stage: Stage, source: ToolError) -> Self {
        MergeError::Tool { stage, source }
    }
}
