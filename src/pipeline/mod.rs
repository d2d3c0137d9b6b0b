//! The merge pipeline.
//!
//! Stages run strictly in order:
//!
//! `INIT → DECOMPILE_BASE → DECOMPILE_SPLITS → MERGE_MANIFEST → MERGE_RESOURCES
//! → RECOMPILE → CLEANUP_WORKSPACE → ALIGN → SIGN → CLEANUP_ARTIFACTS`
//!
//! Any failure up to and including RECOMPILE is fatal and returned as an
//! error. The workspace is torn down on every path once it exists. Failures
//! from ALIGN onward stop the pipeline but are not errors: the best artifact
//! produced so far is reported through [`PipelineOutcome`].

pub mod package;

pub use package::{preflight, Package, PackageRole};

use crate::core::path::{aligned_path, idsig_path, manifest_path, remove_file_if_exists, MERGED_ROOTS};
use crate::core::{ErrorHelp, MergeError, MergeResult, Stage, ToolError};
use crate::resources::{OverwritePolicy, TreeMergeReport, TreeMerger};
use crate::tools::PackageTools;
use crate::workspace::{SigningArtifacts, Workspace};
use apkmerge_core::{merge_manifests, DedupPolicy};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default output file name
pub const DEFAULT_OUTPUT: &str = "combined.apk";

/// Inputs and policies for one run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    /// Base package first, then splits
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    /// Keystore for signing; generated (and later removed) when missing
    pub keystore: PathBuf,
    /// Directory that receives the temporary workspace
    pub work_dir: PathBuf,
    pub dedup: DedupPolicy,
    pub on_conflict: OverwritePolicy,
}

impl PipelineOptions {
    pub fn new(inputs: Vec<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            inputs,
            output: output.into(),
            keystore: PathBuf::from("my-release-key.jks"),
            work_dir: PathBuf::from("."),
            dedup: DedupPolicy::default(),
            on_conflict: OverwritePolicy::default(),
        }
    }
}

/// How far the pipeline got
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// The output archive is aligned and signed
    Signed { output: PathBuf },

    /// Alignment or signing failed; the output archive is the unsigned rebuild
    Unsigned {
        output: PathBuf,
        stage: Stage,
        reason: ToolError,
    },

    /// Keystore generation failed; the aligned archive is kept next to the
    /// unsigned output
    AlignedUnsigned {
        aligned: PathBuf,
        unsigned: PathBuf,
        reason: ToolError,
    },
}

impl PipelineOutcome {
    /// The best artifact this run produced
    pub fn deliverable(&self) -> &Path {
        match self {
            PipelineOutcome::Signed { output } => output,
            PipelineOutcome::Unsigned { output, .. } => output,
            PipelineOutcome::AlignedUnsigned { aligned, .. } => aligned,
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, PipelineOutcome::Signed { .. })
    }
}

/// Drives one merge run over a set of tool collaborators
pub struct Pipeline<T: PackageTools> {
    tools: T,
    options: PipelineOptions,
}

impl<T: PackageTools> Pipeline<T> {
    pub fn new(tools: T, options: PipelineOptions) -> Self {
        Self { tools, options }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn tools(&self) -> &T {
        &self.tools
    }

    pub fn run(&self) -> MergeResult<PipelineOutcome> {
        debug!(stage = %Stage::Init, inputs = self.options.inputs.len(), "Starting merge");
        let mut packages = preflight(&self.options.inputs)?;

        let mut workspace = Workspace::create_in(&self.options.work_dir)?;
        let built = self.build_unsigned(&mut workspace, &mut packages);

        debug!(stage = %Stage::CleanupWorkspace, "Removing workspace");
        eprintln!("Cleaning up temporary folder...");
        if let Err(e) = workspace.teardown() {
            warn!(
                "Failed to remove workspace {}: {}",
                workspace.root().display(),
                e
            );
        }
        built?;

        eprintln!(
            "✓ Merge complete! Unsigned APK: {}",
            self.options.output.display()
        );
        self.align_and_sign()
    }

    /// DECOMPILE_BASE through RECOMPILE
    fn build_unsigned(&self, workspace: &mut Workspace, packages: &mut [Package]) -> MergeResult<()> {
        let (base_dir, split_dirs) = self.decompile_all(workspace, packages)?;
        self.merge_manifest(&base_dir, &split_dirs)?;
        self.merge_resources(&base_dir, &split_dirs)?;
        self.recompile(&base_dir)
    }

    fn decompile_all(
        &self,
        workspace: &mut Workspace,
        packages: &mut [Package],
    ) -> MergeResult<(PathBuf, Vec<PathBuf>)> {
        let mut base_dir = None;
        let mut split_dirs = Vec::new();

        for package in packages.iter_mut() {
            let dir = workspace.allocate(&package.role.dir_name());
            let stage = match package.role {
                PackageRole::Base => {
                    eprintln!("Decompiling base APK: {}", package.path.display());
                    Stage::DecompileBase
                }
                PackageRole::Split(index) => {
                    eprintln!("Decompiling APK {}: {}", index + 1, package.path.display());
                    Stage::DecompileSplits
                }
            };
            debug!(%stage, dir = %dir.display(), "Decompiling");

            self.tools
                .decompile(&package.path, &dir)
                .map_err(|e| MergeError::tool(stage, e))?;

            package.workspace_dir = Some(dir.clone());
            if package.is_base() {
                base_dir = Some(dir);
            } else {
                split_dirs.push(dir);
            }
        }

        let base_dir = base_dir.ok_or(MergeError::NoInputs)?;
        Ok((base_dir, split_dirs))
    }

    fn merge_manifest(&self, base_dir: &Path, split_dirs: &[PathBuf]) -> MergeResult<()> {
        debug!(stage = %Stage::MergeManifest, "Merging manifests");
        eprintln!("Merging AndroidManifest.xml...");

        let base_manifest = manifest_path(base_dir);
        let split_manifests: Vec<PathBuf> = split_dirs.iter().map(|d| manifest_path(d)).collect();
        let merged = merge_manifests(&base_manifest, &split_manifests, self.options.dedup)?;

        for appended in merged.appended.iter().filter(|a| a.count > 0) {
            eprintln!("  + {} <{}> declaration(s)", appended.count, appended.tag);
        }
        if !merged.stripped.is_empty() {
            eprintln!("  Removed split attributes: {}", merged.stripped.join(", "));
        }

        merged.write(&base_manifest)
    }

    fn merge_resources(&self, base_dir: &Path, split_dirs: &[PathBuf]) -> MergeResult<TreeMergeReport> {
        debug!(stage = %Stage::MergeResources, policy = %self.options.on_conflict, "Merging trees");
        eprintln!("Merging resources...");

        let merger = TreeMerger::new(self.options.on_conflict);
        let mut report = TreeMergeReport::default();
        for split_dir in split_dirs {
            for root in MERGED_ROOTS {
                report.absorb(merger.merge_trees(&base_dir.join(root), &[split_dir.join(root)])?);
            }
        }

        eprintln!(
            "  ✓ {} file(s) merged, {} overwritten",
            report.files_copied,
            report.overwritten.len()
        );
        Ok(report)
    }

    fn recompile(&self, base_dir: &Path) -> MergeResult<()> {
        debug!(stage = %Stage::Recompile, "Rebuilding");
        eprintln!("Rebuilding APK...");

        let output = &self.options.output;
        if remove_file_if_exists(output)? {
            debug!("Removed existing {}", output.display());
        }
        self.tools
            .recompile(base_dir, output)
            .map_err(|e| MergeError::tool(Stage::Recompile, e))
    }

    /// ALIGN through CLEANUP_ARTIFACTS
    fn align_and_sign(&self) -> MergeResult<PipelineOutcome> {
        let output = self.options.output.clone();
        let aligned = aligned_path(&output);

        debug!(stage = %Stage::Align, aligned = %aligned.display(), "Aligning");
        eprintln!("Aligning APK with zipalign...");
        if let Err(e) = remove_file_if_exists(&aligned) {
            let reason = ToolError::new(
                "zipalign",
                None,
                format!("could not remove stale {}: {}", aligned.display(), e),
            );
            report_stop(Stage::Align, &reason);
            return Ok(PipelineOutcome::Unsigned {
                output,
                stage: Stage::Align,
                reason,
            });
        }
        if let Err(reason) = self.tools.align(&output, &aligned) {
            report_stop(Stage::Align, &reason);
            if let Err(e) = remove_file_if_exists(&aligned) {
                warn!("Could not remove {}: {}", aligned.display(), e);
            }
            return Ok(PipelineOutcome::Unsigned {
                output,
                stage: Stage::Align,
                reason,
            });
        }

        let keystore = &self.options.keystore;
        let generated = !keystore.exists();
        if generated {
            debug!(stage = %Stage::GenerateCredential, keystore = %keystore.display(), "Generating keystore");
            eprintln!("Generating signing keystore...");
            if let Err(reason) = self.tools.generate_credential(keystore) {
                report_stop(Stage::GenerateCredential, &reason);
                return Ok(PipelineOutcome::AlignedUnsigned {
                    aligned,
                    unsigned: output,
                    reason,
                });
            }
        }

        let mut artifacts = SigningArtifacts::new();
        artifacts.track(&aligned);
        artifacts.track(idsig_path(&output));
        if generated {
            artifacts.track(keystore);
        }

        debug!(stage = %Stage::Sign, "Signing");
        eprintln!("Signing APK...");
        let signed = self.tools.sign(keystore, &aligned, &output);

        debug!(stage = %Stage::CleanupArtifacts, "Removing signing artifacts");
        eprintln!("Cleaning up temporary files...");
        for removed in artifacts.release() {
            eprintln!("  Removed: {}", removed.display());
        }

        match signed {
            Ok(()) => Ok(PipelineOutcome::Signed { output }),
            Err(reason) => {
                report_stop(Stage::Sign, &reason);
                Ok(PipelineOutcome::Unsigned {
                    output,
                    stage: Stage::Sign,
                    reason,
                })
            }
        }
    }
}

fn report_stop(stage: Stage, reason: &ToolError) {
    debug!(%stage, "Stopping: {}", reason);
    eprintln!("⚠️  Warning: {} failed: {}", stage, reason);
    if let Some(help) = reason.help() {
        eprintln!("{}", help);
    }
}
