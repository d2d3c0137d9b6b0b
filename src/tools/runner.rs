use crate::core::ToolError;
use std::ffi::OsString;
use std::process::{Command, Stdio};
use tracing::debug;

/// Captured output of a successful tool run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs a program with an argument vector. No shell is involved, so paths
/// with spaces or metacharacters are passed through untouched.
pub trait ToolRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<ToolOutput, ToolError>;
}

/// Runs tools as child processes, blocking until they exit
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<ToolOutput, ToolError> {
        let resolved = which::which(program).map_err(|e| ToolError::launch(program, e))?;
        debug!(program, ?args, "Running {}", resolved.display());

        let output = Command::new(&resolved)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ToolError::launch(program, e))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            // apktool reports some failures on stdout only
            let detail = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(ToolError::new(program, output.status.code(), detail));
        }

        if !stdout.trim().is_empty() {
            debug!(program, "{}", stdout.trim_end());
        }
        Ok(ToolOutput { stdout, stderr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_launch_failure() {
        let err = ProcessRunner
            .run("apkmerge-definitely-not-installed", &[])
            .unwrap_err();
        assert!(err.is_launch_failure());
        assert_eq!(err.tool, "apkmerge-definitely-not-installed");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_typed() {
        let err = ProcessRunner
            .run("sh", &["-c".into(), "echo broken >&2; exit 3".into()])
            .unwrap_err();
        assert_eq!(err.exit_code, Some(3));
        assert_eq!(err.stderr.trim(), "broken");
    }

    #[cfg(unix)]
    #[test]
    fn test_arguments_are_not_shell_interpreted() {
        let output = ProcessRunner
            .run("echo", &["$HOME; echo injected".into()])
            .unwrap();
        assert_eq!(output.stdout.trim(), "$HOME; echo injected");
    }
}
