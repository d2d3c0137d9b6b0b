use apkmerge::core::format_error_with_help;
use apkmerge::manifest::DedupPolicy;
use apkmerge::resources::OverwritePolicy;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cli;

#[derive(Parser)]
#[command(name = "apkmerge")]
#[command(about = "Merge a base APK and its split APKs into one standalone APK")]
#[command(
    after_help = "Example: apkmerge base.apk split_assetpack.apk split_config.arm64_v8a.apk -o combined.apk"
)]
#[command(version)]
struct Cli {
    /// APK files to merge: the base package first, then its splits
    #[arg(required = true, value_name = "APK")]
    apk_files: Vec<PathBuf>,

    /// Output APK path
    #[arg(short, long, default_value = apkmerge::pipeline::DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Config file (defaults to <config dir>/apkmerge/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keystore used for signing; generated when missing
    #[arg(long)]
    keystore: Option<PathBuf>,

    /// Reporting when a split overwrites an existing file: silent or warn
    #[arg(long, value_name = "POLICY")]
    on_conflict: Option<OverwritePolicy>,

    /// Declaration equality for manifest merging: shallow or deep
    #[arg(long, value_name = "POLICY")]
    dedup: Option<DedupPolicy>,

    /// Show debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_filter = if cli.verbose {
        "apkmerge=debug,apkmerge_core=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = cli::merge::run(cli::merge::MergeArgs {
        apk_files: cli.apk_files,
        output: cli.output,
        config: cli.config,
        keystore: cli.keystore,
        on_conflict: cli.on_conflict,
        dedup: cli.dedup,
    });

    // Display error with helpful suggestions
    if let Err(ref e) = result {
        eprintln!("\n{}", format_error_with_help(e));
        std::process::exit(1);
    }
}
