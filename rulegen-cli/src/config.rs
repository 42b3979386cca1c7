//! Configuration file loading for rulegen.
//!
//! Discovers and loads `rulegen.toml` from the repository root.
//! Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use rulegen_core::settings::{DEFAULT_BUILD_FILE_NAMES, GenerateSettings};
use rulegen_types::{ExternalRepo, GeneratorConfig, ResolverMode};
use serde::Deserialize;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "rulegen.toml";

/// Top-level configuration from rulegen.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RulegenConfig {
    pub generator: GeneratorSection,

    /// Import path prefixes served by named external repositories.
    pub external_repos: Vec<ExternalRepo>,
}

/// `[generator]` section of the config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorSection {
    /// Import path of the repository root.
    pub go_prefix: Option<String>,

    /// Resolver mode: external, vendored or workspace.
    pub mode: Option<String>,

    /// Project roots for workspace mode, relative to the repository root.
    pub project_dirs: Vec<Utf8PathBuf>,

    /// Build file names to look for, in order.
    pub build_file_names: Vec<String>,

    pub jobs: Option<usize>,
}

/// Discover the rulegen.toml config file.
///
/// Returns `None` if there is no config file in the repository root.
pub fn discover_config(repo_root: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = repo_root.join(CONFIG_FILE_NAME);
    if config_path.is_file() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse a rulegen.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<RulegenConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

/// Parse a config file from a string.
pub fn parse_config(contents: &str) -> anyhow::Result<RulegenConfig> {
    let config: RulegenConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load config from repo root, or return default if not found.
pub fn load_or_default(repo_root: &Utf8Path) -> anyhow::Result<RulegenConfig> {
    match discover_config(repo_root) {
        Some(path) => load_config(&path),
        None => Ok(RulegenConfig::default()),
    }
}

/// `generate` flags that can override the config file.
#[derive(Debug, Clone, Default)]
pub struct GenerateOverrides {
    pub repo_root: Utf8PathBuf,
    pub go_prefix: Option<String>,
    pub mode: Option<String>,
    pub project_dirs: Vec<Utf8PathBuf>,
    pub build_file_names: Vec<String>,
    pub jobs: Option<usize>,
    pub dry_run: bool,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: RulegenConfig,
}

impl ConfigMerger {
    pub fn new(config: RulegenConfig) -> Self {
        Self { config }
    }

    /// Merge with generate command CLI arguments.
    ///
    /// Scalar flags replace config values. `--project-dir` extends the configured roots;
    /// `--build-file-name` replaces the configured list since its order matters.
    pub fn merge_generate_args(self, cli: &GenerateOverrides) -> anyhow::Result<GenerateSettings> {
        let section = self.config.generator;

        let go_prefix = cli
            .go_prefix
            .clone()
            .or(section.go_prefix)
            .filter(|p| !p.trim().is_empty())
            .context("go_prefix is not set; pass --go-prefix or set it under [generator]")?;

        let mode = match cli.mode.as_deref().or(section.mode.as_deref()) {
            Some(mode) => mode.parse::<ResolverMode>()?,
            None => ResolverMode::External,
        };

        let mut project_dirs = section.project_dirs;
        for dir in &cli.project_dirs {
            if !project_dirs.contains(dir) {
                project_dirs.push(dir.clone());
            }
        }

        let build_file_names = if !cli.build_file_names.is_empty() {
            cli.build_file_names.clone()
        } else if !section.build_file_names.is_empty() {
            section.build_file_names
        } else {
            DEFAULT_BUILD_FILE_NAMES
                .iter()
                .map(|n| n.to_string())
                .collect()
        };

        let jobs = cli
            .jobs
            .or(section.jobs)
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()));

        Ok(GenerateSettings {
            generator: GeneratorConfig {
                go_prefix,
                mode,
                repo_root: cli.repo_root.clone(),
                project_dirs,
                external_repos: self.config.external_repos,
                ..GeneratorConfig::default()
            },
            build_file_names,
            jobs,
            dry_run: cli.dry_run,
        })
    }
}
