use super::ResolveErrorKind;
use rulegen_types::kinds::DEFAULT_LIB_NAME;
use rulegen_types::{ConfigError, ExternalRepo, Label};

/// Resolves third-party imports to rules in external repositories, one repository per
/// repository root (`github.com/foo/bar/baz` lives in `@com_github_foo_bar//baz`).
#[derive(Debug, Clone, Default)]
pub struct ExternalResolver {
    /// Configured repositories, longest prefix first.
    registry: Vec<RegistryEntry>,
}

/// Imports under `prefix` live in `repo`, below the package `pkg_root`.
#[derive(Debug, Clone)]
struct RegistryEntry {
    prefix: String,
    repo: String,
    pkg_root: String,
}

impl ExternalResolver {
    pub(crate) fn new(repos: &[ExternalRepo]) -> Result<Self, ConfigError> {
        let mut registry = Vec::with_capacity(repos.len());
        for repo in repos {
            let prefix = repo.prefix.trim_end_matches('/');
            if prefix.is_empty() {
                return Err(ConfigError::InvalidExternalRepo {
                    prefix: repo.prefix.clone(),
                    reason: "prefix is empty".to_string(),
                });
            }
            let (name, pkg_root) =
                registry_target(&repo.repo).ok_or_else(|| ConfigError::InvalidExternalRepo {
                    prefix: repo.prefix.clone(),
                    reason: format!(
                        "`{}` is neither a repository name nor an `@repo//package` label",
                        repo.repo
                    ),
                })?;
            registry.push(RegistryEntry {
                prefix: prefix.to_string(),
                repo: name,
                pkg_root,
            });
        }
        registry.sort_by(|a, b| {
            b.prefix
                .len()
                .cmp(&a.prefix.len())
                .then_with(|| a.prefix.cmp(&b.prefix))
        });
        Ok(Self { registry })
    }

    pub(crate) fn resolve(&self, importpath: &str) -> Result<Label, ResolveErrorKind> {
        let (root, repo, pkg_root) = match self
            .registry
            .iter()
            .find(|r| under(&r.prefix, importpath))
        {
            Some(r) => (r.prefix.as_str(), r.repo.clone(), r.pkg_root.as_str()),
            None => {
                let root = repo_root(importpath).ok_or(ResolveErrorKind::UnknownExternal)?;
                (root, repo_name(root), "")
            }
        };
        let sub = importpath[root.len()..].trim_start_matches('/');
        let pkg = match (pkg_root, sub) {
            ("", sub) => sub.to_string(),
            (root, "") => root.to_string(),
            (root, sub) => format!("{root}/{sub}"),
        };
        Ok(Label::new(repo, pkg, DEFAULT_LIB_NAME))
    }
}

fn under(prefix: &str, importpath: &str) -> bool {
    importpath == prefix
        || importpath
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Repository and package root of a registry entry: a bare repository name, or a label such as
/// `@org_example//third_party/go` naming a package inside the repository.
fn registry_target(repo: &str) -> Option<(String, String)> {
    if !repo.starts_with('@') {
        return valid_repo_name(repo).then(|| (repo.to_string(), String::new()));
    }
    // An explicit target name has no meaning here.
    if repo.contains(':') {
        return None;
    }
    let label = Label::parse(repo).ok()?;
    valid_repo_name(&label.repo).then_some((label.repo, label.pkg))
}

fn valid_repo_name(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_alphabetic())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Repository root of `importpath` by well-known hosting conventions.
fn repo_root(importpath: &str) -> Option<&str> {
    let segments: Vec<&str> = importpath.split('/').collect();
    let len = match segments.as_slice() {
        ["github.com" | "gitlab.com" | "bitbucket.org", ..] => 3,
        ["golang.org", "x", ..] => 3,
        ["google.golang.org" | "cloud.google.com", ..] => 2,
        ["gopkg.in", pkg, ..] if is_gopkg_version(pkg) => 2,
        ["gopkg.in", _, pkg, ..] if is_gopkg_version(pkg) => 3,
        _ => return None,
    };
    if segments.len() < len || segments[..len].iter().any(|s| s.is_empty()) {
        return None;
    }
    let end = segments[..len].iter().map(|s| s.len()).sum::<usize>() + len - 1;
    Some(&importpath[..end])
}

/// `yaml.v2`-style gopkg.in package segment.
fn is_gopkg_version(segment: &str) -> bool {
    segment.rsplit_once(".v").is_some_and(|(name, v)| {
        !name.is_empty() && !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit())
    })
}

/// Repository name for a root: host components reversed, then the path, joined by `_`.
fn repo_name(root: &str) -> String {
    let (host, path) = root.split_once('/').unwrap_or((root, ""));
    host.split('.')
        .rev()
        .chain(path.split('/').filter(|s| !s.is_empty()))
        .map(|part| {
            part.chars()
                .map(|c| match c {
                    '.' | '-' => '_',
                    c => c.to_ascii_lowercase(),
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("_")
}
