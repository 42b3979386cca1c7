//! Build labels.
//!
//! Text forms: `@repo//pkg:name`, `//pkg:name` (local repository) and `:name` (same package).

use std::fmt;
use std::str::FromStr;

/// Fully-qualified identifier of a build rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Label {
    /// External repository name; empty for the local repository.
    pub repo: String,
    /// Package path relative to the repository root.
    pub pkg: String,
    pub name: String,
    /// Relative to the current package (`:name`); `repo` and `pkg` are ignored.
    pub relative: bool,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unable to parse the label `{label}`")]
pub struct LabelParseError {
    label: String,
}

impl Label {
    pub fn new(repo: impl Into<String>, pkg: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            pkg: pkg.into(),
            name: name.into(),
            relative: false,
        }
    }

    /// A label in the local repository.
    pub fn local(pkg: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new("", pkg, name)
    }

    /// A `:name` label.
    pub fn relative(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relative: true,
            ..Self::default()
        }
    }

    pub fn parse(label: &str) -> Result<Self, LabelParseError> {
        let err = || LabelParseError {
            label: label.to_owned(),
        };

        if let Some(name) = label.strip_prefix(':') {
            if !valid_name(name) {
                return Err(err());
            }
            return Ok(Self::relative(name));
        }

        let (repo, rest) = match label.strip_prefix('@') {
            Some(after) => {
                let (repo, rest) = after.split_once("//").ok_or_else(err)?;
                if repo.is_empty() || repo.contains(['/', ':']) {
                    return Err(err());
                }
                (repo, rest)
            }
            None => ("", label.strip_prefix("//").ok_or_else(err)?),
        };

        let (pkg, name) = match rest.split_once(':') {
            Some((pkg, name)) => (pkg, name),
            // `//foo/bar` is shorthand for `//foo/bar:bar`.
            None => (rest, rest.rsplit('/').next().unwrap_or(rest)),
        };
        if !valid_package(pkg) || !valid_name(name) {
            return Err(err());
        }

        Ok(Self::new(repo, pkg, name))
    }
}

fn valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(':') && !name.starts_with('/')
}

fn valid_package(pkg: &str) -> bool {
    !pkg.starts_with('/') && !pkg.ends_with('/') && !pkg.contains("//") && !pkg.contains(':')
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.relative {
            return write!(f, ":{}", self.name);
        }
        if !self.repo.is_empty() {
            write!(f, "@{}", self.repo)?;
        }
        write!(f, "//{}:{}", self.pkg, self.name)
    }
}

impl FromStr for Label {
    type Err = LabelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
