//! Default filesystem-backed port implementations.

use crate::ports::{PackageSource, RepoView, WritePort};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use rulegen_types::Package;
use serde::Deserialize;
use tracing::debug;

/// The package scanner's output document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageManifest {
    #[serde(default)]
    pub packages: Vec<Package>,
}

/// Parses a package manifest. Packages come back sorted by their repository-relative path.
pub fn parse_manifest(contents: &str) -> anyhow::Result<Vec<Package>> {
    let manifest: PackageManifest =
        serde_json::from_str(contents).context("invalid package manifest JSON")?;
    let mut packages = manifest.packages;
    sort_packages(&mut packages);
    Ok(packages)
}

fn sort_packages(packages: &mut [Package]) {
    packages.sort_by(|a, b| a.rel.cmp(&b.rel).then_with(|| a.dir.cmp(&b.dir)));
}

/// Loads the package manifest from a JSON file.
#[derive(Debug, Clone)]
pub struct FsPackageSource {
    pub path: Utf8PathBuf,
}

impl FsPackageSource {
    pub fn new(path: Utf8PathBuf) -> Self {
        Self { path }
    }
}

impl PackageSource for FsPackageSource {
    fn load_packages(&self) -> anyhow::Result<Vec<Package>> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("read package manifest {}", self.path))?;
        let packages =
            parse_manifest(&contents).with_context(|| format!("parse {}", self.path))?;
        debug!(path = %self.path, packages = packages.len(), "loaded package manifest");
        Ok(packages)
    }
}

/// In-memory package source for embedding and testing.
///
/// Sorts on construction to match `FsPackageSource`'s ordering.
#[derive(Debug, Clone)]
pub struct InMemoryPackageSource {
    packages: Vec<Package>,
}

impl InMemoryPackageSource {
    pub fn new(mut packages: Vec<Package>) -> Self {
        sort_packages(&mut packages);
        Self { packages }
    }
}

impl PackageSource for InMemoryPackageSource {
    fn load_packages(&self) -> anyhow::Result<Vec<Package>> {
        Ok(self.packages.clone())
    }
}

/// Repository view over the real filesystem. Relative paths are taken from the root.
#[derive(Debug, Clone)]
pub struct FsRepoView {
    root: Utf8PathBuf,
}

impl FsRepoView {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    fn abs(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl RepoView for FsRepoView {
    fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn is_file(&self, path: &Utf8Path) -> bool {
        self.abs(path).is_file()
    }

    fn read_to_string(&self, path: &Utf8Path) -> anyhow::Result<String> {
        let abs = self.abs(path);
        fs::read_to_string(&abs).with_context(|| format!("read build file {}", abs))
    }
}

/// Filesystem write operations.
#[derive(Debug, Clone, Default)]
pub struct FsWritePort;

impl WritePort for FsWritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create parent dir for {}", path))?;
        }
        fs::write(path, contents).with_context(|| format!("write {}", path))
    }
}
