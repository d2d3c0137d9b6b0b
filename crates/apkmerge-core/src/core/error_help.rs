use crate::core::{MergeError, ToolError};

/// Provides helpful suggestions for common errors
pub trait ErrorHelp {
    fn help(&self) -> Option<String>;
}

/// Name the package that usually provides a given tool.
fn tool_provider(tool: &str) -> Option<&'static str> {
    let name = std::path::Path::new(tool)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(tool);
    match name {
        "apktool" => Some("apktool (https://apktool.org)"),
        "zipalign" | "apksigner" => Some("the Android SDK build tools"),
        "keytool" => Some("a Java JDK"),
        _ => None,
    }
}

impl ErrorHelp for ToolError {
    fn help(&self) -> Option<String> {
        let provider = tool_provider(&self.tool);
        if self.is_launch_failure() {
            let hint = match provider {
                Some(p) => format!(
                    "💡 Suggestion: '{}' could not be started. Install {} and make sure it is on your PATH",
                    self.tool, p
                ),
                None => format!(
                    "💡 Suggestion: '{}' could not be started. Check that it is installed and on your PATH",
                    self.tool
                ),
            };
            return Some(hint);
        }
        provider.map(|p| {
            format!(
                "💡 Suggestion: Check the output of '{}' above, and confirm {} is installed and up to date",
                self.tool, p
            )
        })
    }
}

impl ErrorHelp for MergeError {
    fn help(&self) -> Option<String> {
        match self {
            MergeError::NoInputs => Some(
                "💡 Suggestion: Pass the base APK first, followed by its splits, e.g. 'apkmerge base.apk split_config.arm64_v8a.apk'"
                    .to_string(),
            ),
            MergeError::InputNotFound(_) => Some(
                "💡 Suggestion: Check the file path spelling, or run from the directory containing the APKs"
                    .to_string(),
            ),
            MergeError::Parse { .. } => Some(
                "💡 Suggestion: The decompiled AndroidManifest.xml is not well-formed. Try a newer apktool release"
                    .to_string(),
            ),
            MergeError::Structure(msg) => {
                if msg.contains("application") {
                    Some(
                        "💡 Suggestion: Make sure every input is an application package; resource-only archives cannot be merged"
                            .to_string(),
                    )
                } else {
                    Some(
                        "💡 Suggestion: Make sure every input is an APK decompiled by apktool"
                            .to_string(),
                    )
                }
            }
            MergeError::Tool { source, .. } => source.help(),
            MergeError::Config(_) | MergeError::Yaml(_) => Some(
                "💡 Suggestion: Check your config.yaml syntax, or delete it to fall back to defaults"
                    .to_string(),
            ),
            MergeError::Io(e) => {
                if e.kind() == std::io::ErrorKind::PermissionDenied {
                    Some(
                        "💡 Suggestion: Check file permissions, or try running with appropriate permissions"
                            .to_string(),
                    )
                } else if e.kind() == std::io::ErrorKind::NotFound {
                    Some(
                        "💡 Suggestion: The file or directory may not exist. Check the path and try again"
                            .to_string(),
                    )
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

/// Format an error with helpful suggestions
pub fn format_error_with_help(error: &MergeError) -> String {
    let mut output = format!("❌ Error: {}", error);

    if let Some(help) = error.help() {
        output.push_str("\n\n");
        output.push_str(&help);
    }

    output
}
