use super::ResolveErrorKind;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use rulegen_types::Label;
use rulegen_types::kinds::DEFAULT_LIB_NAME;
use std::cmp::Reverse;

/// Resolves third-party imports into the `vendor/` directory of the project that contains the
/// importing package.
#[derive(Debug, Clone)]
pub struct WorkspaceResolver {
    /// Project roots relative to the repository root, most specific first.
    roots: Vec<String>,
}

impl WorkspaceResolver {
    pub(crate) fn new(repo_root: &Utf8Path, project_dirs: &[Utf8PathBuf]) -> Self {
        let mut roots: Vec<String> = project_dirs
            .iter()
            .map(|dir| relative_root(repo_root, dir))
            .collect();
        roots.sort_by_key(|r| (Reverse(segment_count(r)), Reverse(r.clone())));
        roots.dedup();
        Self { roots }
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub(crate) fn resolve(&self, importpath: &str, dir: &str) -> Result<Label, ResolveErrorKind> {
        let root = self
            .roots
            .iter()
            .find(|root| contains(root, dir))
            .ok_or(ResolveErrorKind::NoProjectRoot)?;
        let pkg = if root.is_empty() {
            format!("vendor/{importpath}")
        } else {
            format!("{root}/vendor/{importpath}")
        };
        Ok(Label::local(pkg, DEFAULT_LIB_NAME))
    }
}

fn relative_root(repo_root: &Utf8Path, dir: &Utf8Path) -> String {
    let rel = dir.strip_prefix(repo_root).unwrap_or(dir);
    rel.components()
        .filter_map(|c| match c {
            Utf8Component::Normal(s) => Some(s),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn segment_count(root: &str) -> usize {
    if root.is_empty() {
        0
    } else {
        root.split('/').count()
    }
}

/// `root` contains `dir` on a directory boundary.
fn contains(root: &str, dir: &str) -> bool {
    root.is_empty()
        || dir == root
        || dir
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/'))
}
