//! Generator configuration.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How imports outside the module prefix are mapped to labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolverMode {
    /// Third-party packages live in external repositories, one per repository root.
    External,
    /// Third-party packages live under `vendor/` in the main repository.
    Vendored,
    /// The repository holds independently-rooted projects, each with its own `vendor/`.
    Workspace,
}

impl ResolverMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ResolverMode::External => "external",
            ResolverMode::Vendored => "vendored",
            ResolverMode::Workspace => "workspace",
        }
    }
}

impl fmt::Display for ResolverMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolverMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "external" => Ok(ResolverMode::External),
            "vendored" | "vendor" => Ok(ResolverMode::Vendored),
            "workspace" | "uno" => Ok(ResolverMode::Workspace),
            _ => Err(ConfigError::UnknownResolverMode {
                mode: s.to_string(),
            }),
        }
    }
}

/// A registry entry mapping an import path prefix to an external repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRepo {
    pub prefix: String,
    pub repo: String,
}

/// Configuration errors are fatal: no generator is produced.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unrecognized resolver mode `{mode}` (expected external, vendored or workspace)")]
    UnknownResolverMode { mode: String },

    #[error("build file name must not be empty")]
    EmptyBuildFileName,

    #[error("invalid external repository entry `{prefix}`: {reason}")]
    InvalidExternalRepo { prefix: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Import path of the repository root package (`go_prefix`).
    pub go_prefix: String,
    pub mode: ResolverMode,
    pub repo_root: Utf8PathBuf,
    /// Project roots for [`ResolverMode::Workspace`], absolute or relative to `repo_root`.
    pub project_dirs: Vec<Utf8PathBuf>,
    /// Build file name for new files.
    pub build_file_name: String,
    pub external_repos: Vec<ExternalRepo>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            go_prefix: String::new(),
            mode: ResolverMode::External,
            repo_root: Utf8PathBuf::from("."),
            project_dirs: Vec::new(),
            build_file_name: "BUILD.bazel".to_string(),
            external_repos: Vec::new(),
        }
    }
}
