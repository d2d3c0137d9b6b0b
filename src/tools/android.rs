use crate::config::{AlignConfig, Config, SigningConfig, ToolsConfig};
use crate::core::ToolError;
use crate::tools::runner::{ProcessRunner, ToolRunner};
use crate::tools::PackageTools;
use std::ffi::OsString;
use std::path::Path;

/// [`PackageTools`] backed by the Android SDK command-line tools
#[derive(Debug, Clone)]
pub struct AndroidTools<R: ToolRunner = ProcessRunner> {
    runner: R,
    tools: ToolsConfig,
    align: AlignConfig,
    signing: SigningConfig,
}

impl AndroidTools<ProcessRunner> {
    pub fn from_config(config: &Config) -> Self {
        Self::with_runner(ProcessRunner, config)
    }
}

impl<R: ToolRunner> AndroidTools<R> {
    pub fn with_runner(runner: R, config: &Config) -> Self {
        Self {
            runner,
            tools: config.tools.clone(),
            align: config.align.clone(),
            signing: config.signing.clone(),
        }
    }

    fn run(&self, program: &str, args: Vec<OsString>) -> Result<(), ToolError> {
        self.runner.run(program, &args).map(|_| ())
    }
}

fn arg(s: impl Into<OsString>) -> OsString {
    s.into()
}

impl<R: ToolRunner> PackageTools for AndroidTools<R> {
    fn decompile(&self, archive: &Path, output_dir: &Path) -> Result<(), ToolError> {
        self.run(
            &self.tools.apktool,
            vec![
                arg("d"),
                arg(archive),
                arg("-o"),
                arg(output_dir),
                arg("-f"),
            ],
        )
    }

    fn recompile(&self, workspace_dir: &Path, output_archive: &Path) -> Result<(), ToolError> {
        self.run(
            &self.tools.apktool,
            vec![arg("b"), arg(workspace_dir), arg("-o"), arg(output_archive)],
        )
    }

    fn align(&self, input: &Path, output: &Path) -> Result<(), ToolError> {
        let mut args = vec![arg("-v")];
        if self.align.page_align {
            args.push(arg("-p"));
        }
        args.push(arg(self.align.alignment.to_string()));
        args.push(arg(input));
        args.push(arg(output));
        self.run(&self.tools.zipalign, args)
    }

    fn generate_credential(&self, credential: &Path) -> Result<(), ToolError> {
        if credential.exists() {
            return Ok(());
        }
        let signing = &self.signing;
        self.run(
            &self.tools.keytool,
            vec![
                arg("-genkey"),
                arg("-v"),
                arg("-keystore"),
                arg(credential),
                arg("-keyalg"),
                arg("RSA"),
                arg("-keysize"),
                arg(signing.key_size.to_string()),
                arg("-validity"),
                arg(signing.validity_days.to_string()),
                arg("-alias"),
                arg(&signing.alias),
                arg("-storepass"),
                arg(&signing.password),
                arg("-keypass"),
                arg(&signing.password),
                arg("-dname"),
                arg(&signing.dname),
            ],
        )
    }

    fn sign(&self, credential: &Path, input: &Path, output: &Path) -> Result<(), ToolError> {
        let signing = &self.signing;
        self.run(
            &self.tools.apksigner,
            vec![
                arg("sign"),
                arg("--ks"),
                arg(credential),
                arg("--ks-key-alias"),
                arg(&signing.alias),
                arg("--ks-pass"),
                arg(format!("pass:{}", signing.password)),
                arg("--out"),
                arg(output),
                arg(input),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::runner::ToolOutput;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Records invocations instead of running anything
    #[derive(Default)]
    struct RecordingRunner {
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl ToolRunner for &RecordingRunner {
        fn run(&self, program: &str, args: &[OsString]) -> Result<ToolOutput, ToolError> {
            let mut call = vec![program.to_string()];
            call.extend(args.iter().map(|a| a.to_string_lossy().into_owned()));
            self.calls.borrow_mut().push(call);
            Ok(ToolOutput::default())
        }
    }

    fn joined(runner: &RecordingRunner) -> Vec<String> {
        runner.calls.borrow().iter().map(|c| c.join(" ")).collect()
    }

    #[test]
    fn test_apktool_invocations() {
        let runner = RecordingRunner::default();
        let tools = AndroidTools::with_runner(&runner, &Config::default());

        tools
            .decompile(Path::new("my app.apk"), Path::new("ws/base"))
            .unwrap();
        tools
            .recompile(Path::new("ws/base"), Path::new("combined.apk"))
            .unwrap();

        let calls = runner.calls.borrow();
        assert_eq!(calls[0], vec!["apktool", "d", "my app.apk", "-o", "ws/base", "-f"]);
        assert_eq!(calls[1], vec!["apktool", "b", "ws/base", "-o", "combined.apk"]);
    }

    #[test]
    fn test_zipalign_invocation_follows_config() {
        let runner = RecordingRunner::default();
        let mut config = Config::default();
        config.tools.zipalign = "/sdk/build-tools/zipalign".to_string();
        let tools = AndroidTools::with_runner(&runner, &config);
        tools
            .align(Path::new("combined.apk"), Path::new("combined-align.apk"))
            .unwrap();

        config.align.page_align = false;
        config.align.alignment = 8;
        let tools = AndroidTools::with_runner(&runner, &config);
        tools
            .align(Path::new("combined.apk"), Path::new("combined-align.apk"))
            .unwrap();

        assert_eq!(
            joined(&runner),
            vec![
                "/sdk/build-tools/zipalign -v -p 4 combined.apk combined-align.apk",
                "/sdk/build-tools/zipalign -v 8 combined.apk combined-align.apk",
            ]
        );
    }

    #[test]
    fn test_signing_invocations() {
        let temp = TempDir::new().unwrap();
        let keystore = temp.path().join("my-release-key.jks");
        let runner = RecordingRunner::default();
        let tools = AndroidTools::with_runner(&runner, &Config::default());

        tools.generate_credential(&keystore).unwrap();
        tools
            .sign(&keystore, Path::new("combined-align.apk"), Path::new("combined.apk"))
            .unwrap();

        let calls = runner.calls.borrow();
        assert_eq!(calls[0][0], "keytool");
        assert!(calls[0].contains(&"-genkey".to_string()));
        assert!(calls[0].contains(&"my-alias".to_string()));
        assert!(calls[0].contains(
            &"CN=Unknown, OU=Unknown, O=Unknown, L=Unknown, ST=Unknown, C=Unknown".to_string()
        ));

        assert_eq!(calls[1][0], "apksigner");
        assert_eq!(
            &calls[1][calls[1].len() - 4..],
            &["pass:123456", "--out", "combined.apk", "combined-align.apk"]
        );
    }

    #[test]
    fn test_existing_keystore_is_not_regenerated() {
        let temp = TempDir::new().unwrap();
        let keystore = temp.path().join("release.jks");
        std::fs::write(&keystore, b"existing").unwrap();

        let runner = RecordingRunner::default();
        let tools = AndroidTools::with_runner(&runner, &Config::default());
        tools.generate_credential(&keystore).unwrap();

        assert!(runner.calls.borrow().is_empty());
    }
}
