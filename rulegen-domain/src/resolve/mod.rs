//! Import path to label resolution.
//!
//! Imports inside the module prefix (or written relative to the importing package) always go
//! through the structured resolver. Everything else is handed to the strategy picked by the
//! configured [`ResolverMode`]. The choice is made per import, so one target can mix both.

mod external;
mod structured;
mod vendored;
mod workspace;

use rulegen_types::{ConfigError, GeneratorConfig, Label, ResolverMode};

pub use external::ExternalResolver;
pub use vendored::VendoredResolver;
pub use workspace::WorkspaceResolver;

use structured::StructuredResolver;

/// Failure to resolve one import; the import is dropped from `deps`.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("in dir \"{dir}\", could not resolve import path \"{importpath}\": {kind}")]
pub struct ResolveError {
    pub importpath: String,
    pub dir: String,
    pub kind: ResolveErrorKind,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ResolveErrorKind {
    #[error("relative import escapes the repository root")]
    EscapesRoot,

    #[error("no external repository is known for this import path")]
    UnknownExternal,

    #[error("directory is not inside any configured project root")]
    NoProjectRoot,
}

/// Strategy for imports outside the module prefix.
#[derive(Debug, Clone)]
pub enum ModeResolver {
    External(ExternalResolver),
    Vendored(VendoredResolver),
    Workspace(WorkspaceResolver),
}

impl ModeResolver {
    fn resolve(&self, importpath: &str, dir: &str) -> Result<Label, ResolveErrorKind> {
        match self {
            ModeResolver::External(r) => r.resolve(importpath),
            ModeResolver::Vendored(r) => Ok(r.resolve(importpath)),
            ModeResolver::Workspace(r) => r.resolve(importpath, dir),
        }
    }
}

/// Resolves import paths to labels. Built once and shared read-only between workers.
#[derive(Debug, Clone)]
pub struct Resolver {
    structured: StructuredResolver,
    mode: ModeResolver,
}

impl Resolver {
    pub fn new(config: &GeneratorConfig) -> Result<Self, ConfigError> {
        let mode = match config.mode {
            ResolverMode::External => {
                ModeResolver::External(ExternalResolver::new(&config.external_repos)?)
            }
            ResolverMode::Vendored => ModeResolver::Vendored(VendoredResolver),
            ResolverMode::Workspace => ModeResolver::Workspace(WorkspaceResolver::new(
                &config.repo_root,
                &config.project_dirs,
            )),
        };
        Ok(Self {
            structured: StructuredResolver::new(&config.go_prefix),
            mode,
        })
    }

    /// Resolves `importpath` imported from the package at `dir` (relative to the repository
    /// root, slash-separated).
    pub fn resolve(&self, importpath: &str, dir: &str) -> Result<Label, ResolveError> {
        let resolved = if self.structured.handles(importpath) {
            self.structured.resolve(importpath, dir)
        } else {
            self.mode.resolve(importpath, dir)
        };
        resolved.map_err(|kind| ResolveError {
            importpath: importpath.to_string(),
            dir: dir.to_string(),
            kind,
        })
    }
}
