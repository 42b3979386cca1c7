//! Package model handed over by the external package scanner.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Strings that may vary per target platform: a generic list plus per-platform additions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformStrings {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generic: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub platform: BTreeMap<String, Vec<String>>,
}

impl PlatformStrings {
    pub fn generic<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            generic: items.into_iter().map(Into::into).collect(),
            platform: BTreeMap::new(),
        }
    }

    pub fn with_platform<I, S>(mut self, platform: &str, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.platform
            .entry(platform.to_string())
            .or_default()
            .extend(items.into_iter().map(Into::into));
        self
    }

    /// True when there are no strings for any platform.
    pub fn is_empty(&self) -> bool {
        self.generic.is_empty() && self.platform.values().all(Vec::is_empty)
    }

    pub fn has_platform_specific(&self) -> bool {
        self.platform.values().any(|v| !v.is_empty())
    }

    /// Applies `f` to every string. Successes keep their position; failures are collected
    /// separately and the failing string is left out.
    pub fn map<F, E>(&self, mut f: F) -> (PlatformStrings, Vec<E>)
    where
        F: FnMut(&str) -> Result<String, E>,
    {
        let mut errors = Vec::new();
        let mut map_list = |list: &[String]| -> Vec<String> {
            list.iter()
                .filter_map(|s| match f(s) {
                    Ok(v) => Some(v),
                    Err(e) => {
                        errors.push(e);
                        None
                    }
                })
                .collect()
        };

        let generic = map_list(&self.generic);
        let platform = self
            .platform
            .iter()
            .map(|(k, v)| (k.clone(), map_list(v)))
            .collect();
        (PlatformStrings { generic, platform }, errors)
    }

    /// Sorts and deduplicates; strings present generically are removed from platform lists and
    /// empty platforms are dropped.
    pub fn clean(&mut self) {
        self.generic.sort();
        self.generic.dedup();
        let generic: BTreeSet<&String> = self.generic.iter().collect();
        for list in self.platform.values_mut() {
            list.retain(|s| !generic.contains(s));
            list.sort();
            list.dedup();
        }
        self.platform.retain(|_, list| !list.is_empty());
    }
}

/// One buildable target of a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Target {
    pub srcs: PlatformStrings,
    pub imports: PlatformStrings,
    pub copts: PlatformStrings,
    pub clinkopts: PlatformStrings,
}

impl Target {
    pub fn has_sources(&self) -> bool {
        !self.srcs.is_empty()
    }
}

/// A source package as classified by the package scanner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Package {
    /// Directory of the package: absolute, or relative to the repository root. When empty, `rel`
    /// is used.
    pub dir: Utf8PathBuf,
    /// Slash-separated path relative to the repository root; empty for the root package.
    pub rel: String,

    pub library: Target,
    pub cgo_library: Target,
    pub binary: Target,
    pub test: Target,
    pub xtest: Target,

    /// Package is a command (`package main`).
    pub is_command: bool,
    /// Checked-in generated `.pb.go` files are present.
    pub has_pb_go: bool,
    pub has_testdata: bool,
    /// `.proto` files in the directory.
    pub protos: Vec<String>,
}

impl Package {
    pub fn is_root(&self) -> bool {
        self.rel.is_empty()
    }
}
