mod config;

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use config::{ConfigMerger, GenerateOverrides};
use rulegen_core::adapters::{FsPackageSource, FsRepoView, FsWritePort};
use rulegen_core::pipeline::{FileStatus, run_generate};
use rulegen_types::kinds::{FILE_GUARD_KINDS, FILEGROUP_KIND, LOADABLE_KINDS, RULES_MODULE};
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "rulegen",
    version,
    about = "Generates and updates Bazel BUILD files for Go packages."
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate build files for every package in a package manifest, merging with existing files.
    Generate(GenerateArgs),
    /// List the rule kinds the generator knows about.
    ListKinds(ListKindsArgs),
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    /// Package manifest produced by the package scanner (JSON).
    #[arg(long)]
    packages: Utf8PathBuf,

    /// Repository root (default: current directory).
    #[arg(long, default_value = ".")]
    repo_root: Utf8PathBuf,

    /// Import path of the repository root package.
    #[arg(long)]
    go_prefix: Option<String>,

    /// How third-party imports are resolved (external, vendored, workspace).
    #[arg(long)]
    mode: Option<String>,

    /// Project root for workspace mode; repeatable.
    #[arg(long = "project-dir")]
    project_dirs: Vec<Utf8PathBuf>,

    /// Build file name to look for, in order; repeatable. New files get the first.
    #[arg(long = "build-file-name")]
    build_file_names: Vec<String>,

    /// Worker threads (default: available parallelism).
    #[arg(long)]
    jobs: Option<usize>,

    /// Print a unified diff instead of writing files.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[derive(Debug, Parser)]
struct ListKindsArgs {
    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        error!("{:?}", e);
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Generate(args) => cmd_generate(args),
        Command::ListKinds(args) => cmd_list_kinds(args),
    }
}

fn cmd_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let file_config =
        config::load_or_default(&args.repo_root).context("load rulegen.toml config")?;
    let settings = ConfigMerger::new(file_config).merge_generate_args(&GenerateOverrides {
        repo_root: args.repo_root.clone(),
        go_prefix: args.go_prefix,
        mode: args.mode,
        project_dirs: args.project_dirs,
        build_file_names: args.build_file_names,
        jobs: args.jobs,
        dry_run: args.dry_run,
    })?;

    debug!(
        "merged config: go_prefix={}, mode={}, build_file_names={:?}, jobs={}",
        settings.generator.go_prefix,
        settings.generator.mode,
        settings.build_file_names,
        settings.jobs
    );

    let outcome = run_generate(
        &settings,
        &FsPackageSource::new(args.packages),
        &FsRepoView::new(args.repo_root.clone()),
        &FsWritePort,
    )?;

    if settings.dry_run {
        print!("{}", outcome.patch);
    } else {
        for file in outcome
            .files
            .iter()
            .filter(|f| f.status != FileStatus::Unchanged)
        {
            let path = file.path.strip_prefix(&args.repo_root).unwrap_or(&file.path);
            println!("{:<9} {}", file.status.as_str(), path);
        }
    }

    for failure in &outcome.failures {
        eprintln!("error: {}: {}", failure.path, failure.error);
    }
    if outcome.has_failures() {
        anyhow::bail!("{} package(s) failed", outcome.failures.len());
    }
    Ok(())
}

fn cmd_list_kinds(args: ListKindsArgs) -> anyhow::Result<()> {
    let rows: Vec<(&str, &str, Option<&str>)> = LOADABLE_KINDS
        .iter()
        .map(|k| (*k, "generated", Some(RULES_MODULE)))
        .chain(std::iter::once((FILEGROUP_KIND, "generated", None)))
        .chain(FILE_GUARD_KINDS.iter().map(|k| (*k, "file-guard", None)))
        .collect();

    match args.format {
        OutputFormat::Text => {
            println!("  {:<20} {:<12} LOAD", "KIND", "HANDLING");
            println!("  {:<20} {:<12} ----", "----", "--------");
            for (kind, handling, load) in &rows {
                println!("  {:<20} {:<12} {}", kind, handling, load.unwrap_or("-"));
            }
        }
        OutputFormat::Json => {
            let kinds: Vec<_> = rows
                .iter()
                .map(|(kind, handling, load)| {
                    serde_json::json!({
                        "kind": kind,
                        "handling": handling,
                        "load": load,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&kinds)?);
        }
    }
    Ok(())
}
