use apkmerge::config::Config;
use apkmerge::core::{MergeError, MergeResult};
use apkmerge::manifest::DedupPolicy;
use apkmerge::pipeline::{preflight, Pipeline, PipelineOptions, PipelineOutcome};
use apkmerge::resources::OverwritePolicy;
use apkmerge::tools::AndroidTools;
use std::env;
use std::path::PathBuf;

pub struct MergeArgs {
    pub apk_files: Vec<PathBuf>,
    pub output: PathBuf,
    pub config: Option<PathBuf>,
    pub keystore: Option<PathBuf>,
    pub on_conflict: Option<OverwritePolicy>,
    pub dedup: Option<DedupPolicy>,
}

pub fn run(args: MergeArgs) -> MergeResult<()> {
    // Every input must exist before anything else happens
    preflight(&args.apk_files)?;

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let work_dir = env::current_dir()
        .map_err(|e| MergeError::Config(format!("Failed to get current directory: {}", e)))?;

    let mut options = PipelineOptions::new(args.apk_files, args.output);
    options.keystore = args.keystore.unwrap_or_else(|| config.signing.keystore.clone());
    options.work_dir = work_dir;
    options.on_conflict = args.on_conflict.unwrap_or(config.merge.on_conflict);
    options.dedup = args.dedup.unwrap_or(config.merge.dedup);

    let pipeline = Pipeline::new(AndroidTools::from_config(&config), options);
    match pipeline.run()? {
        PipelineOutcome::Signed { output } => {
            println!("✓ Done! Final APK: {}", output.display());
        }
        PipelineOutcome::Unsigned { output, stage, .. } => {
            println!(
                "Stopped after {} failed. Unsigned APK: {}",
                stage,
                output.display()
            );
        }
        PipelineOutcome::AlignedUnsigned {
            aligned, unsigned, ..
        } => {
            println!(
                "Stopped before signing. Aligned APK: {} (unaligned: {})",
                aligned.display(),
                unsigned.display()
            );
        }
    }

    Ok(())
}
